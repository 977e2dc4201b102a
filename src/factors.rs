use std::collections::BTreeMap;

use crate::error::{ensure_quantity, FootprintError};
use crate::models::{Category, Currency, ElectricityRegion, Spend};

pub const CAR_KM: &str = "car_km";
pub const BUS_KM: &str = "bus_km";
pub const FLIGHT_SHORT_HAUL: &str = "flight_short_haul";
pub const FLIGHT_LONG_HAUL: &str = "flight_long_haul";
pub const GRID_NIGERIA: &str = "grid_nigeria";
pub const GRID_GLOBAL: &str = "grid_global";
pub const BEEF_KG: &str = "beef_kg";
pub const CHICKEN_KG: &str = "chicken_kg";
pub const SPEND_USD: &str = "spend_usd";

/// kg CO2e per passenger-km flown, economy class.
const FLIGHT_KM: f64 = 0.115;
const SHORT_HAUL_KM: f64 = 1_100.0;
const LONG_HAUL_KM: f64 = 6_500.0;

pub const NGN_PER_USD: f64 = 1_500.0;

#[derive(Debug, Clone, PartialEq)]
pub struct FactorEntry {
    pub category: Category,
    pub key: &'static str,
    pub factor: f64,
    pub unit: &'static str,
}

type KeyedFactors = BTreeMap<&'static str, (f64, &'static str)>;

/// Emission factors in kg CO2e per base unit. Built once at startup and only
/// ever read afterwards.
#[derive(Debug, Clone)]
pub struct EmissionFactors {
    table: BTreeMap<Category, KeyedFactors>,
    ngn_per_usd: f64,
}

impl EmissionFactors {
    pub fn standard() -> Self {
        let rows = [
            (Category::Transport, CAR_KM, 0.251, "km"),
            (Category::Transport, BUS_KM, 0.089, "km"),
            (
                Category::Transport,
                FLIGHT_SHORT_HAUL,
                SHORT_HAUL_KM * FLIGHT_KM,
                "flight",
            ),
            (
                Category::Transport,
                FLIGHT_LONG_HAUL,
                LONG_HAUL_KM * FLIGHT_KM,
                "flight",
            ),
            (Category::Electricity, GRID_NIGERIA, 0.80, "kWh"),
            (Category::Electricity, GRID_GLOBAL, 0.92, "kWh"),
            (Category::Diet, BEEF_KG, 27.0, "kg"),
            (Category::Diet, CHICKEN_KG, 6.9, "kg"),
            (Category::Shopping, SPEND_USD, 0.6, "USD"),
        ];

        let mut table: BTreeMap<Category, KeyedFactors> = BTreeMap::new();
        for (category, key, factor, unit) in rows {
            table
                .entry(category)
                .or_default()
                .insert(key, (factor, unit));
        }

        EmissionFactors {
            table,
            ngn_per_usd: NGN_PER_USD,
        }
    }

    pub fn lookup(&self, category: Category, key: &str) -> Result<f64, FootprintError> {
        self.table
            .get(&category)
            .and_then(|keys| keys.get(key))
            .map(|(factor, _)| *factor)
            .ok_or_else(|| FootprintError::UnknownFactorKey {
                category,
                key: key.to_string(),
            })
    }

    /// kg CO2e per kWh for the region. A custom factor is returned as given
    /// once it passes the quantity check.
    pub fn grid_factor(&self, region: ElectricityRegion) -> Result<f64, FootprintError> {
        match region {
            ElectricityRegion::Nigeria => self.lookup(Category::Electricity, GRID_NIGERIA),
            ElectricityRegion::GlobalAverage => self.lookup(Category::Electricity, GRID_GLOBAL),
            ElectricityRegion::Custom(factor) => ensure_quantity("grid_factor", factor),
        }
    }

    pub fn ngn_per_usd(&self) -> f64 {
        self.ngn_per_usd
    }

    pub fn to_usd(&self, spend: Spend) -> f64 {
        match spend.currency {
            Currency::Usd => spend.amount,
            Currency::Ngn => spend.amount / self.ngn_per_usd,
        }
    }

    pub fn entries(&self) -> Vec<FactorEntry> {
        self.table
            .iter()
            .flat_map(|(category, keys)| {
                keys.iter().map(move |(key, (factor, unit))| FactorEntry {
                    category: *category,
                    key: *key,
                    factor: *factor,
                    unit: *unit,
                })
            })
            .collect()
    }
}
