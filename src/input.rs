use clap::Args;
use serde::Deserialize;

use crate::error::{ensure_within, FootprintError};
use crate::models::{Currency, ElectricityRegion, Flights, InputRecord, Spend};

const KM_PER_MILE: f64 = 1.609_344;

// Upper bounds of the form fields, in the units the user types them.
pub const MAX_DISTANCE_PER_YEAR: f64 = 1_000_000.0;
pub const MAX_FLIGHTS_PER_YEAR: f64 = 1_000.0;
pub const MAX_KWH_PER_YEAR: f64 = 1_000_000.0;
pub const MAX_GRID_FACTOR: f64 = 5.0;
pub const MAX_KG_PER_WEEK: f64 = 50.0;
pub const MAX_MONTHLY_SPEND: f64 = 1_000_000_000.0;

fn default_region() -> String {
    "global-average".to_string()
}

fn default_currency() -> String {
    "USD".to_string()
}

/// A submission as typed by the user, either as command-line flags or as one
/// row of an import file. Nothing here is trusted until [`RawInput::validate`].
#[derive(Debug, Clone, Args, Deserialize)]
pub struct RawInput {
    /// Distance driven by car per year
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    #[serde(default)]
    pub car_km_per_year: f64,
    /// Short-haul flights per year
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    #[serde(default)]
    pub short_haul_flights: f64,
    /// Long-haul flights per year
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    #[serde(default)]
    pub long_haul_flights: f64,
    /// Distance travelled by bus per year
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    #[serde(default)]
    pub bus_km_per_year: f64,
    /// Household electricity use per year (kWh)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    #[serde(default)]
    pub electricity_kwh_per_year: f64,
    /// Grid factor source: nigeria, global-average or custom
    #[arg(long, default_value = "global-average")]
    #[serde(default = "default_region")]
    pub electricity_region: String,
    /// kg CO2e per kWh, required with --electricity-region custom
    #[arg(long, allow_negative_numbers = true)]
    #[serde(default)]
    pub grid_factor: Option<f64>,
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    #[serde(default)]
    pub beef_kg_per_week: f64,
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    #[serde(default)]
    pub chicken_kg_per_week: f64,
    /// Spend on general goods per month
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    #[serde(default)]
    pub monthly_shopping_spend: f64,
    /// USD or NGN
    #[arg(long, default_value = "USD")]
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Unit for car and bus distances: km or miles
    #[arg(long)]
    #[serde(default)]
    pub distance_unit: Option<String>,
}

impl RawInput {
    pub fn validate(&self) -> Result<InputRecord, FootprintError> {
        let km_per_unit = distance_scale(self.distance_unit.as_deref())?;

        let car = ensure_within(
            "car_km_per_year",
            self.car_km_per_year,
            MAX_DISTANCE_PER_YEAR,
        )?;
        let bus = ensure_within(
            "bus_km_per_year",
            self.bus_km_per_year,
            MAX_DISTANCE_PER_YEAR,
        )?;

        let region = ElectricityRegion::parse(&self.electricity_region, self.grid_factor)?;
        if let Some(factor) = region.custom_factor() {
            ensure_within("grid_factor", factor, MAX_GRID_FACTOR)?;
        }

        Ok(InputRecord {
            car_km_per_year: car * km_per_unit,
            flights: Flights {
                short_haul: flight_count("short_haul_flights", self.short_haul_flights)?,
                long_haul: flight_count("long_haul_flights", self.long_haul_flights)?,
            },
            bus_km_per_year: bus * km_per_unit,
            electricity_kwh_per_year: ensure_within(
                "electricity_kwh_per_year",
                self.electricity_kwh_per_year,
                MAX_KWH_PER_YEAR,
            )?,
            electricity_region: region,
            beef_kg_per_week: ensure_within(
                "beef_kg_per_week",
                self.beef_kg_per_week,
                MAX_KG_PER_WEEK,
            )?,
            chicken_kg_per_week: ensure_within(
                "chicken_kg_per_week",
                self.chicken_kg_per_week,
                MAX_KG_PER_WEEK,
            )?,
            monthly_shopping: Spend {
                amount: ensure_within(
                    "monthly_shopping_spend",
                    self.monthly_shopping_spend,
                    MAX_MONTHLY_SPEND,
                )?,
                currency: self.currency.parse::<Currency>()?,
            },
        })
    }
}

fn distance_scale(unit: Option<&str>) -> Result<f64, FootprintError> {
    match unit.map(|value| value.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") | Some("km") => Ok(1.0),
        Some("mi") | Some("mile") | Some("miles") => Ok(KM_PER_MILE),
        Some(other) => Err(FootprintError::invalid(
            "distance_unit",
            format!("unknown unit '{other}' (expected km or miles)"),
        )),
    }
}

fn flight_count(field: &str, value: f64) -> Result<u32, FootprintError> {
    let value = ensure_within(field, value, MAX_FLIGHTS_PER_YEAR)?;
    if value.fract() != 0.0 {
        return Err(FootprintError::invalid(field, "must be a whole number of flights"));
    }
    Ok(value as u32)
}
