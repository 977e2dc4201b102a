use std::fmt::Write;
use std::path::Path;

use anyhow::Context;
use serde::Serialize;

use crate::factors::EmissionFactors;
use crate::models::{FootprintResult, HistoryEntry, InputRecord, Suggestion};
use crate::suggestions;

const BAR_WIDTH: usize = 30;

/// Text bars scaled to the largest category.
pub fn bar_chart(result: &FootprintResult) -> Vec<String> {
    let series = result.chart_series();
    let max = series.iter().map(|(_, value)| *value).fold(0.0_f64, f64::max);

    series
        .iter()
        .map(|(category, value)| {
            let filled = if max > 0.0 {
                ((value / max) * BAR_WIDTH as f64).round() as usize
            } else {
                0
            };
            format!(
                "{:<12} {:<width$} {:>10.0} kg",
                category.label(),
                "#".repeat(filled),
                value,
                width = BAR_WIDTH
            )
        })
        .collect()
}

pub fn build_summary(result: &FootprintResult, tips: &[Suggestion]) -> String {
    let periods = result.periods();
    let mut output = String::new();

    let _ = writeln!(
        output,
        "Estimated annual footprint: {:.0} kg CO2e ({:.2} tonnes)",
        periods.annual_kg, periods.annual_tonnes
    );
    let _ = writeln!(
        output,
        "Daily {:.2} kg | Weekly {:.2} kg | Monthly {:.2} kg | Annual {:.0} kg",
        periods.daily_kg, periods.weekly_kg, periods.monthly_kg, periods.annual_kg
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "Breakdown by category:");
    for line in bar_chart(result) {
        let _ = writeln!(output, "  {line}");
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "Suggestions:");
    for tip in tips {
        let _ = writeln!(output, "- {}", tip.text);
    }

    output
}

pub fn build_report(latest: &HistoryEntry, history: &[HistoryEntry]) -> String {
    let result = &latest.result;
    let periods = result.periods();
    let tips = suggestions::suggest(result);

    let mut output = String::new();
    let _ = writeln!(output, "# Carbon Footprint Report");
    let _ = writeln!(
        output,
        "Latest estimate recorded {}",
        latest.recorded_at.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Summary");
    let _ = writeln!(
        output,
        "- Annual: {:.0} kg CO2e ({:.2} tonnes)",
        periods.annual_kg, periods.annual_tonnes
    );
    let _ = writeln!(output, "- Monthly: {:.2} kg CO2e", periods.monthly_kg);
    let _ = writeln!(output, "- Weekly: {:.2} kg CO2e", periods.weekly_kg);
    let _ = writeln!(output, "- Daily: {:.2} kg CO2e", periods.daily_kg);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Breakdown");
    let _ = writeln!(output, "| Category | Annual kg CO2e | Share |");
    let _ = writeln!(output, "|---|---:|---:|");
    for (category, value) in result.chart_series() {
        let share = if result.total > 0.0 {
            value / result.total * 100.0
        } else {
            0.0
        };
        let _ = writeln!(
            output,
            "| {} | {:.0} | {:.1}% |",
            category.label(),
            value,
            share
        );
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "```");
    for line in bar_chart(result) {
        let _ = writeln!(output, "{line}");
    }
    let _ = writeln!(output, "```");

    let _ = writeln!(output);
    let _ = writeln!(output, "## Suggestions");
    for tip in &tips {
        let _ = writeln!(output, "- {}", tip.text);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## History");
    if history.is_empty() {
        let _ = writeln!(output, "No saved estimates yet.");
    } else {
        let _ = writeln!(
            output,
            "| Recorded | Annual kg | Transport | Electricity | Diet | Shopping |"
        );
        let _ = writeln!(output, "|---|---:|---:|---:|---:|---:|");
        for entry in history {
            let _ = writeln!(
                output,
                "| {} | {:.0} | {:.0} | {:.0} | {:.0} | {:.0} |",
                entry.recorded_at.format("%Y-%m-%d %H:%M"),
                entry.result.total,
                entry.result.transport,
                entry.result.electricity,
                entry.result.diet,
                entry.result.shopping
            );
        }
        if let (Some(first), Some(last)) = (history.first(), history.last()) {
            if history.len() > 1 {
                let change = last.result.total - first.result.total;
                let _ = writeln!(output);
                let _ = writeln!(
                    output,
                    "Change since first estimate: {:+.0} kg CO2e across {} estimates.",
                    change,
                    history.len()
                );
            }
        }
    }

    output
}

pub fn factor_table(factors: &EmissionFactors) -> String {
    let mut output = String::new();
    let _ = writeln!(
        output,
        "{:<12} {:<18} {:>10}  unit",
        "category", "key", "kg CO2e"
    );
    for entry in factors.entries() {
        let _ = writeln!(
            output,
            "{:<12} {:<18} {:>10.3}  per {}",
            entry.category.to_string(),
            entry.key,
            entry.factor,
            entry.unit
        );
    }
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "Fixed exchange rate: {:.0} NGN per USD",
        factors.ngn_per_usd()
    );
    output
}

/// One flat CSV row per history entry.
#[derive(Debug, Serialize)]
struct HistoryCsvRow {
    id: String,
    recorded_at: String,
    car_km_per_year: f64,
    short_haul_flights: u32,
    long_haul_flights: u32,
    bus_km_per_year: f64,
    electricity_kwh_per_year: f64,
    electricity_region: &'static str,
    grid_factor: Option<f64>,
    beef_kg_per_week: f64,
    chicken_kg_per_week: f64,
    monthly_shopping_spend: f64,
    currency: String,
    transport_kg: f64,
    electricity_kg: f64,
    diet_kg: f64,
    shopping_kg: f64,
    total_kg: f64,
}

impl HistoryCsvRow {
    fn new(entry: &HistoryEntry) -> Self {
        let input: &InputRecord = &entry.input;
        HistoryCsvRow {
            id: entry.id.to_string(),
            recorded_at: entry.recorded_at.to_rfc3339(),
            car_km_per_year: input.car_km_per_year,
            short_haul_flights: input.flights.short_haul,
            long_haul_flights: input.flights.long_haul,
            bus_km_per_year: input.bus_km_per_year,
            electricity_kwh_per_year: input.electricity_kwh_per_year,
            electricity_region: input.electricity_region.name(),
            grid_factor: input.electricity_region.custom_factor(),
            beef_kg_per_week: input.beef_kg_per_week,
            chicken_kg_per_week: input.chicken_kg_per_week,
            monthly_shopping_spend: input.monthly_shopping.amount,
            currency: input.monthly_shopping.currency.to_string(),
            transport_kg: entry.result.transport,
            electricity_kg: entry.result.electricity,
            diet_kg: entry.result.diet,
            shopping_kg: entry.result.shopping,
            total_kg: entry.result.total,
        }
    }
}

pub fn write_history_csv<W: std::io::Write>(
    writer: W,
    entries: &[HistoryEntry],
) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for entry in entries {
        writer.serialize(HistoryCsvRow::new(entry))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn export_history(
    path: &Path,
    entries: &[HistoryEntry],
    format: ExportFormat,
) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    match format {
        ExportFormat::Csv => write_history_csv(file, entries)?,
        ExportFormat::Json => serde_json::to_writer_pretty(file, entries)?,
    }
    Ok(())
}

/// Subtotals and period views of one estimate, as a one-row CSV.
#[derive(Debug, Serialize)]
struct ResultCsvRow {
    transport_kg: f64,
    electricity_kg: f64,
    diet_kg: f64,
    shopping_kg: f64,
    annual_kg: f64,
    annual_tonnes: f64,
    daily_kg: f64,
    weekly_kg: f64,
    monthly_kg: f64,
}

pub fn write_result_csv<W: std::io::Write>(
    writer: W,
    result: &FootprintResult,
) -> anyhow::Result<()> {
    let periods = result.periods();
    let mut writer = csv::Writer::from_writer(writer);
    writer.serialize(ResultCsvRow {
        transport_kg: result.transport,
        electricity_kg: result.electricity,
        diet_kg: result.diet,
        shopping_kg: result.shopping,
        annual_kg: periods.annual_kg,
        annual_tonnes: periods.annual_tonnes,
        daily_kg: periods.daily_kg,
        weekly_kg: periods.weekly_kg,
        monthly_kg: periods.monthly_kg,
    })?;
    writer.flush()?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
}
