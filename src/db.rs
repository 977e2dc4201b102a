use std::str::FromStr;

use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use uuid::Uuid;

use crate::calculator;
use crate::factors::EmissionFactors;
use crate::input::RawInput;
use crate::models::{
    Currency, ElectricityRegion, Flights, FootprintResult, HistoryEntry, InputRecord, Spend,
};

const SELECT_ENTRIES: &str = "SELECT id, recorded_at, car_km_per_year, short_haul_flights, \
     long_haul_flights, bus_km_per_year, electricity_kwh_per_year, electricity_region, \
     grid_factor, beef_kg_per_week, chicken_kg_per_week, monthly_shopping_spend, currency, \
     transport_kg, electricity_kg, diet_kg, shopping_kg, total_kg \
     FROM history";

/// Append-only log of past estimates. Owned by the caller and passed to
/// whatever needs it.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    pool: SqlitePool,
}

impl HistoryStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid database url {database_url}"))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .context("failed to open history database")?;

        Ok(HistoryStore { pool })
    }

    /// Fresh, migrated store that lives as long as the returned value.
    #[cfg(test)]
    pub async fn in_memory() -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        let store = HistoryStore { pool };
        store.init().await?;
        Ok(store)
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub async fn append(&self, entry: &HistoryEntry) -> anyhow::Result<()> {
        let input = &entry.input;
        let result = &entry.result;

        sqlx::query(
            r#"
            INSERT INTO history
            (id, recorded_at, car_km_per_year, short_haul_flights, long_haul_flights,
             bus_km_per_year, electricity_kwh_per_year, electricity_region, grid_factor,
             beef_kg_per_week, chicken_kg_per_week, monthly_shopping_spend, currency,
             transport_kg, electricity_kg, diet_kg, shopping_kg, total_kg)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            "#,
        )
        .bind(entry.id)
        .bind(entry.recorded_at)
        .bind(input.car_km_per_year)
        .bind(i64::from(input.flights.short_haul))
        .bind(i64::from(input.flights.long_haul))
        .bind(input.bus_km_per_year)
        .bind(input.electricity_kwh_per_year)
        .bind(input.electricity_region.name())
        .bind(input.electricity_region.custom_factor())
        .bind(input.beef_kg_per_week)
        .bind(input.chicken_kg_per_week)
        .bind(input.monthly_shopping.amount)
        .bind(input.monthly_shopping.currency.to_string())
        .bind(result.transport)
        .bind(result.electricity)
        .bind(result.diet)
        .bind(result.shopping)
        .bind(result.total)
        .execute(&self.pool)
        .await
        .context("failed to append history entry")?;

        Ok(())
    }

    /// Most recent entries first.
    pub async fn list(&self, limit: u64) -> anyhow::Result<Vec<HistoryEntry>> {
        let query = format!("{SELECT_ENTRIES} ORDER BY seq DESC LIMIT $1");
        let rows = sqlx::query(&query)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(entry_from_row).collect()
    }

    /// Every entry, oldest first.
    pub async fn all(&self) -> anyhow::Result<Vec<HistoryEntry>> {
        let query = format!("{SELECT_ENTRIES} ORDER BY seq ASC");
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(entry_from_row).collect()
    }

    pub async fn count(&self) -> anyhow::Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM history")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("total"))
    }
}

fn entry_from_row(row: &SqliteRow) -> anyhow::Result<HistoryEntry> {
    let id: Uuid = row.get("id");
    let recorded_at: DateTime<Utc> = row.get("recorded_at");
    let region_name: String = row.get("electricity_region");
    let grid_factor: Option<f64> = row.get("grid_factor");
    let currency: String = row.get("currency");
    let short_haul: i64 = row.get("short_haul_flights");
    let long_haul: i64 = row.get("long_haul_flights");

    let input = InputRecord {
        car_km_per_year: row.get("car_km_per_year"),
        flights: Flights {
            short_haul: u32::try_from(short_haul).context("corrupt short_haul_flights")?,
            long_haul: u32::try_from(long_haul).context("corrupt long_haul_flights")?,
        },
        bus_km_per_year: row.get("bus_km_per_year"),
        electricity_kwh_per_year: row.get("electricity_kwh_per_year"),
        electricity_region: ElectricityRegion::parse(&region_name, grid_factor)?,
        beef_kg_per_week: row.get("beef_kg_per_week"),
        chicken_kg_per_week: row.get("chicken_kg_per_week"),
        monthly_shopping: Spend {
            amount: row.get("monthly_shopping_spend"),
            currency: currency.parse::<Currency>()?,
        },
    };

    let result = FootprintResult {
        transport: row.get("transport_kg"),
        electricity: row.get("electricity_kg"),
        diet: row.get("diet_kg"),
        shopping: row.get("shopping_kg"),
        total: row.get("total_kg"),
    };

    Ok(HistoryEntry {
        id,
        recorded_at,
        input,
        result,
    })
}

#[derive(Debug, Default)]
pub struct ImportSummary {
    pub inserted: usize,
    /// Data line number (1-based, header excluded) and why it was skipped.
    pub rejected: Vec<(usize, String)>,
}

/// Computes and records every valid row of a submissions file. Rows that
/// fail to parse or validate are skipped and reported.
pub async fn import_csv(
    store: &HistoryStore,
    factors: &EmissionFactors,
    csv_path: &std::path::Path,
) -> anyhow::Result<ImportSummary> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut summary = ImportSummary::default();

    for (index, result) in reader.deserialize::<RawInput>().enumerate() {
        let line = index + 1;
        let record = match result {
            Ok(raw) => raw.validate(),
            Err(err) => {
                tracing::warn!(line, error = %err, "skipping unreadable row");
                summary.rejected.push((line, err.to_string()));
                continue;
            }
        };

        match record {
            Ok(input) => {
                calculator::record(store, input, factors).await?;
                summary.inserted += 1;
            }
            Err(err) => {
                tracing::warn!(line, error = %err, "skipping invalid row");
                summary.rejected.push((line, err.to_string()));
            }
        }
    }

    Ok(summary)
}
