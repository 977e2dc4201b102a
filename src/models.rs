use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::FootprintError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Transport,
    Electricity,
    Diet,
    Shopping,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Transport,
        Category::Electricity,
        Category::Diet,
        Category::Shopping,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::Transport => "Transport",
            Category::Electricity => "Electricity",
            Category::Diet => "Diet",
            Category::Shopping => "Shopping",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Transport => "transport",
            Category::Electricity => "electricity",
            Category::Diet => "diet",
            Category::Shopping => "shopping",
        };
        f.write_str(name)
    }
}

/// Grid intensity source for electricity. `Custom` carries the user's own
/// kg CO2e per kWh and skips the factor table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ElectricityRegion {
    Nigeria,
    GlobalAverage,
    Custom(f64),
}

impl ElectricityRegion {
    pub fn name(&self) -> &'static str {
        match self {
            ElectricityRegion::Nigeria => "nigeria",
            ElectricityRegion::GlobalAverage => "global-average",
            ElectricityRegion::Custom(_) => "custom",
        }
    }

    pub fn custom_factor(&self) -> Option<f64> {
        match self {
            ElectricityRegion::Custom(factor) => Some(*factor),
            _ => None,
        }
    }

    /// Builds a region from its name and the optional custom factor.
    pub fn parse(name: &str, custom_factor: Option<f64>) -> Result<Self, FootprintError> {
        let region = match name.trim().to_ascii_lowercase().as_str() {
            "nigeria" => ElectricityRegion::Nigeria,
            "global" | "global-average" | "global_average" | "globalaverage" => {
                ElectricityRegion::GlobalAverage
            }
            "custom" => {
                let factor = custom_factor.ok_or_else(|| {
                    FootprintError::invalid("grid_factor", "required when region is custom")
                })?;
                return Ok(ElectricityRegion::Custom(factor));
            }
            other => {
                return Err(FootprintError::invalid(
                    "electricity_region",
                    format!("unknown region '{other}' (use nigeria, global-average or custom)"),
                ));
            }
        };

        if custom_factor.is_some() {
            return Err(FootprintError::invalid(
                "grid_factor",
                "only allowed when region is custom",
            ));
        }
        Ok(region)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Currency {
    #[serde(rename = "USD")]
    Usd,
    #[serde(rename = "NGN")]
    Ngn,
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Currency::Usd => f.write_str("USD"),
            Currency::Ngn => f.write_str("NGN"),
        }
    }
}

impl FromStr for Currency {
    type Err = FootprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "NGN" => Ok(Currency::Ngn),
            other => Err(FootprintError::invalid(
                "currency",
                format!("unknown currency '{other}' (expected USD or NGN)"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spend {
    pub amount: f64,
    pub currency: Currency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Flights {
    pub short_haul: u32,
    pub long_haul: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputRecord {
    pub car_km_per_year: f64,
    pub flights: Flights,
    pub bus_km_per_year: f64,
    pub electricity_kwh_per_year: f64,
    pub electricity_region: ElectricityRegion,
    pub beef_kg_per_week: f64,
    pub chicken_kg_per_week: f64,
    pub monthly_shopping: Spend,
}

#[cfg(test)]
impl InputRecord {
    /// All quantities zero, global grid, spend in USD.
    pub fn zero() -> Self {
        InputRecord {
            car_km_per_year: 0.0,
            flights: Flights::default(),
            bus_km_per_year: 0.0,
            electricity_kwh_per_year: 0.0,
            electricity_region: ElectricityRegion::GlobalAverage,
            beef_kg_per_week: 0.0,
            chicken_kg_per_week: 0.0,
            monthly_shopping: Spend {
                amount: 0.0,
                currency: Currency::Usd,
            },
        }
    }
}

/// Annual kg CO2e per category. `total` is always the plain sum of the four
/// subtotals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FootprintResult {
    pub transport: f64,
    pub electricity: f64,
    pub diet: f64,
    pub shopping: f64,
    pub total: f64,
}

impl FootprintResult {
    pub fn from_subtotals(transport: f64, electricity: f64, diet: f64, shopping: f64) -> Self {
        FootprintResult {
            transport,
            electricity,
            diet,
            shopping,
            total: transport + electricity + diet + shopping,
        }
    }

    pub fn subtotal(&self, category: Category) -> f64 {
        match category {
            Category::Transport => self.transport,
            Category::Electricity => self.electricity,
            Category::Diet => self.diet,
            Category::Shopping => self.shopping,
        }
    }

    /// Category to subtotal pairs, in display order.
    pub fn chart_series(&self) -> Vec<(Category, f64)> {
        Category::ALL
            .iter()
            .map(|category| (*category, self.subtotal(*category)))
            .collect()
    }

    pub fn periods(&self) -> PeriodBreakdown {
        PeriodBreakdown {
            daily_kg: self.total / 365.0,
            weekly_kg: self.total / 52.0,
            monthly_kg: self.total / 12.0,
            annual_kg: self.total,
            annual_tonnes: self.total / 1000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeriodBreakdown {
    pub daily_kg: f64,
    pub weekly_kg: f64,
    pub monthly_kg: f64,
    pub annual_kg: f64,
    pub annual_tonnes: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub input: InputRecord,
    pub result: FootprintResult,
}

impl HistoryEntry {
    pub fn new(input: InputRecord, result: FootprintResult) -> Self {
        HistoryEntry {
            id: Uuid::new_v4(),
            recorded_at: Utc::now(),
            input,
            result,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub category: Option<Category>,
    pub text: &'static str,
}
