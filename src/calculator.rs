use crate::db::HistoryStore;
use crate::error::{ensure_quantity, FootprintError};
use crate::factors::{
    EmissionFactors, BEEF_KG, BUS_KM, CAR_KM, CHICKEN_KG, FLIGHT_LONG_HAUL, FLIGHT_SHORT_HAUL,
    SPEND_USD,
};
use crate::models::{Category, FootprintResult, HistoryEntry, InputRecord};

const WEEKS_PER_YEAR: f64 = 52.0;
const MONTHS_PER_YEAR: f64 = 12.0;

/// Checks every quantity before anything is multiplied out.
pub fn validate(input: &InputRecord) -> Result<(), FootprintError> {
    ensure_quantity("car_km_per_year", input.car_km_per_year)?;
    ensure_quantity("bus_km_per_year", input.bus_km_per_year)?;
    ensure_quantity("electricity_kwh_per_year", input.electricity_kwh_per_year)?;
    if let Some(factor) = input.electricity_region.custom_factor() {
        ensure_quantity("grid_factor", factor)?;
    }
    ensure_quantity("beef_kg_per_week", input.beef_kg_per_week)?;
    ensure_quantity("chicken_kg_per_week", input.chicken_kg_per_week)?;
    ensure_quantity("monthly_shopping_spend", input.monthly_shopping.amount)?;
    Ok(())
}

/// Annual footprint for one submission. Nothing is rounded here.
pub fn compute(
    input: &InputRecord,
    factors: &EmissionFactors,
) -> Result<FootprintResult, FootprintError> {
    validate(input)?;

    let transport = input.car_km_per_year * factors.lookup(Category::Transport, CAR_KM)?
        + f64::from(input.flights.short_haul)
            * factors.lookup(Category::Transport, FLIGHT_SHORT_HAUL)?
        + f64::from(input.flights.long_haul)
            * factors.lookup(Category::Transport, FLIGHT_LONG_HAUL)?
        + input.bus_km_per_year * factors.lookup(Category::Transport, BUS_KM)?;

    let electricity =
        input.electricity_kwh_per_year * factors.grid_factor(input.electricity_region)?;

    let diet = (input.beef_kg_per_week * factors.lookup(Category::Diet, BEEF_KG)?
        + input.chicken_kg_per_week * factors.lookup(Category::Diet, CHICKEN_KG)?)
        * WEEKS_PER_YEAR;

    let shopping = factors.to_usd(input.monthly_shopping)
        * MONTHS_PER_YEAR
        * factors.lookup(Category::Shopping, SPEND_USD)?;

    let result = FootprintResult::from_subtotals(transport, electricity, diet, shopping);
    if !result.total.is_finite() {
        return Err(FootprintError::invalid(
            "total",
            "quantities are too large to produce a finite footprint",
        ));
    }
    Ok(result)
}

/// Computes and appends to history. Rejected input leaves the store
/// untouched.
pub async fn record(
    store: &HistoryStore,
    input: InputRecord,
    factors: &EmissionFactors,
) -> anyhow::Result<HistoryEntry> {
    let result = compute(&input, factors)?;
    let entry = HistoryEntry::new(input, result);
    store.append(&entry).await?;
    tracing::info!(id = %entry.id, total_kg = entry.result.total, "recorded footprint");
    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Currency, ElectricityRegion, Flights, Spend};
    use proptest::prelude::*;

    fn sample_input() -> InputRecord {
        InputRecord {
            car_km_per_year: 8_000.0,
            flights: Flights {
                short_haul: 2,
                long_haul: 1,
            },
            bus_km_per_year: 520.0,
            electricity_kwh_per_year: 1_800.0,
            electricity_region: ElectricityRegion::Nigeria,
            beef_kg_per_week: 0.3,
            chicken_kg_per_week: 0.5,
            monthly_shopping: Spend {
                amount: 100.0,
                currency: Currency::Usd,
            },
        }
    }

    #[test]
    fn zero_input_yields_zero_total() {
        let factors = EmissionFactors::standard();
        let result = compute(&InputRecord::zero(), &factors).unwrap();
        assert_eq!(result.total, 0.0);
        assert_eq!(result, FootprintResult::from_subtotals(0.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn car_only_total_is_distance_times_factor() {
        let factors = EmissionFactors::standard();
        let input = InputRecord {
            car_km_per_year: 10_000.0,
            ..InputRecord::zero()
        };
        let result = compute(&input, &factors).unwrap();
        let car_factor = factors.lookup(Category::Transport, CAR_KM).unwrap();
        assert_eq!(result.total, 10_000.0 * car_factor);
        assert_eq!(result.transport, result.total);
    }

    #[test]
    fn subtotals_follow_category_formulas() {
        let factors = EmissionFactors::standard();
        let result = compute(&sample_input(), &factors).unwrap();

        let transport = 8_000.0 * 0.251 + 2.0 * 126.5 + 747.5 + 520.0 * 0.089;
        let diet = (0.3 * 27.0 + 0.5 * 6.9) * 52.0;
        assert!((result.transport - transport).abs() < 1e-6);
        assert!((result.electricity - 1_800.0 * 0.80).abs() < 1e-9);
        assert!((result.diet - diet).abs() < 1e-9);
        assert!((result.shopping - 100.0 * 12.0 * 0.6).abs() < 1e-9);
        assert_eq!(
            result.total,
            result.transport + result.electricity + result.diet + result.shopping
        );
    }

    #[test]
    fn custom_grid_factor_is_used_as_is() {
        let input = InputRecord {
            electricity_kwh_per_year: 1_000.0,
            electricity_region: ElectricityRegion::Custom(0.6),
            ..InputRecord::zero()
        };
        let result = compute(&input, &EmissionFactors::standard()).unwrap();
        assert_eq!(result.electricity, 1_000.0 * 0.6);
    }

    #[test]
    fn negative_fields_are_rejected_whole() {
        let factors = EmissionFactors::standard();
        let mutations: [(&str, fn(&mut InputRecord)); 7] = [
            ("car_km_per_year", |i| i.car_km_per_year = -1.0),
            ("bus_km_per_year", |i| i.bus_km_per_year = -1.0),
            ("electricity_kwh_per_year", |i| i.electricity_kwh_per_year = -1.0),
            ("grid_factor", |i| i.electricity_region = ElectricityRegion::Custom(-0.2)),
            ("beef_kg_per_week", |i| i.beef_kg_per_week = -0.5),
            ("chicken_kg_per_week", |i| i.chicken_kg_per_week = -0.5),
            ("monthly_shopping_spend", |i| i.monthly_shopping.amount = -10.0),
        ];

        for (expected_field, mutate) in mutations {
            let mut input = sample_input();
            mutate(&mut input);
            match compute(&input, &factors) {
                Err(FootprintError::InvalidInput { field, .. }) => {
                    assert_eq!(field, expected_field)
                }
                other => panic!("expected InvalidInput for {expected_field}, got {other:?}"),
            }
        }
    }

    #[test]
    fn nan_quantity_is_rejected() {
        let input = InputRecord {
            beef_kg_per_week: f64::NAN,
            ..InputRecord::zero()
        };
        assert!(compute(&input, &EmissionFactors::standard()).is_err());
    }

    #[test]
    fn overflowing_quantities_are_rejected() {
        let input = InputRecord {
            beef_kg_per_week: 1e306,
            ..InputRecord::zero()
        };
        match compute(&input, &EmissionFactors::standard()) {
            Err(FootprintError::InvalidInput { field, .. }) => assert_eq!(field, "total"),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn overflowing_submission_is_not_recorded() {
        let store = HistoryStore::in_memory().await.unwrap();
        let input = InputRecord {
            monthly_shopping: Spend {
                amount: f64::MAX,
                currency: Currency::Usd,
            },
            ..InputRecord::zero()
        };

        assert!(record(&store, input, &EmissionFactors::standard())
            .await
            .is_err());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn record_appends_only_valid_submissions() {
        let store = HistoryStore::in_memory().await.unwrap();
        let factors = EmissionFactors::standard();

        let entry = record(&store, sample_input(), &factors).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);

        let mut bad = sample_input();
        bad.car_km_per_year = -5.0;
        let err = record(&store, bad, &factors).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FootprintError>(),
            Some(FootprintError::InvalidInput { .. })
        ));
        assert_eq!(store.count().await.unwrap(), 1);

        let listed = store.list(10).await.unwrap();
        assert_eq!(listed[0].id, entry.id);
    }

    fn quantity() -> impl Strategy<Value = f64> {
        0.0..50_000.0f64
    }

    prop_compose! {
        fn valid_input()(
            car in quantity(),
            short_haul in 0u32..40,
            long_haul in 0u32..20,
            bus in quantity(),
            kwh in quantity(),
            region in 0u8..3,
            custom in 0.0..2.0f64,
            beef in 0.0..10.0f64,
            chicken in 0.0..10.0f64,
            spend in 0.0..1_000_000.0f64,
            ngn in any::<bool>(),
        ) -> InputRecord {
            InputRecord {
                car_km_per_year: car,
                flights: Flights { short_haul, long_haul },
                bus_km_per_year: bus,
                electricity_kwh_per_year: kwh,
                electricity_region: match region {
                    0 => ElectricityRegion::Nigeria,
                    1 => ElectricityRegion::GlobalAverage,
                    _ => ElectricityRegion::Custom(custom),
                },
                beef_kg_per_week: beef,
                chicken_kg_per_week: chicken,
                monthly_shopping: Spend {
                    amount: spend,
                    currency: if ngn { Currency::Ngn } else { Currency::Usd },
                },
            }
        }
    }

    proptest! {
        #[test]
        fn total_equals_sum_of_subtotals(input in valid_input()) {
            let result = compute(&input, &EmissionFactors::standard()).unwrap();
            prop_assert_eq!(
                result.total,
                result.transport + result.electricity + result.diet + result.shopping
            );
        }

        #[test]
        fn compute_is_deterministic(input in valid_input()) {
            let factors = EmissionFactors::standard();
            prop_assert_eq!(compute(&input, &factors).unwrap(), compute(&input, &factors).unwrap());
        }

        #[test]
        fn raising_a_quantity_never_lowers_the_footprint(
            input in valid_input(),
            field in 0usize..8,
            bump in 0.0..1_000.0f64,
        ) {
            let factors = EmissionFactors::standard();
            let before = compute(&input, &factors).unwrap();

            let mut raised = input.clone();
            let category = match field {
                0 => { raised.car_km_per_year += bump; Category::Transport }
                1 => { raised.flights.short_haul += 1; Category::Transport }
                2 => { raised.flights.long_haul += 1; Category::Transport }
                3 => { raised.bus_km_per_year += bump; Category::Transport }
                4 => { raised.electricity_kwh_per_year += bump; Category::Electricity }
                5 => { raised.beef_kg_per_week += bump; Category::Diet }
                6 => { raised.chicken_kg_per_week += bump; Category::Diet }
                _ => { raised.monthly_shopping.amount += bump; Category::Shopping }
            };
            let after = compute(&raised, &factors).unwrap();

            prop_assert!(after.subtotal(category) >= before.subtotal(category));
            prop_assert!(after.total >= before.total);
        }

        #[test]
        fn ngn_spend_matches_converted_usd_spend(spend in 0.0..10_000_000.0f64) {
            let factors = EmissionFactors::standard();
            let in_ngn = InputRecord {
                monthly_shopping: Spend { amount: spend, currency: Currency::Ngn },
                ..InputRecord::zero()
            };
            let in_usd = InputRecord {
                monthly_shopping: Spend {
                    amount: spend / factors.ngn_per_usd(),
                    currency: Currency::Usd,
                },
                ..InputRecord::zero()
            };
            let ngn = compute(&in_ngn, &factors).unwrap().shopping;
            let usd = compute(&in_usd, &factors).unwrap().shopping;
            prop_assert!((ngn - usd).abs() <= 1e-9 * usd.abs().max(1.0));
        }
    }
}
