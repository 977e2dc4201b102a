use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod calculator;
mod db;
mod error;
mod factors;
mod input;
mod models;
mod report;
mod suggestions;

use db::HistoryStore;
use factors::EmissionFactors;
use input::RawInput;
use report::ExportFormat;

const DEFAULT_DATABASE_URL: &str = "sqlite://footprint_history.db";

#[derive(Parser)]
#[command(name = "footprint")]
#[command(about = "Personal carbon footprint estimator with local history", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the history database
    InitDb,
    /// Estimate the annual footprint for one set of inputs
    Calculate {
        #[command(flatten)]
        input: RawInput,
        /// Append the estimate to the local history
        #[arg(long)]
        save: bool,
        /// Print the estimate as JSON instead of a summary
        #[arg(long, conflicts_with = "csv")]
        json: bool,
        /// Print the subtotals and period views as one CSV row
        #[arg(long)]
        csv: bool,
    },
    /// Estimate and save every row of a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Show recent saved estimates
    History {
        #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
        limit: u64,
    },
    /// Write the full history to a file
    Export {
        #[arg(long)]
        out: PathBuf,
        #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,
    },
    /// Generate a markdown report for the latest estimate
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Print the emission factor table
    Factors,
}

async fn open_store() -> anyhow::Result<HistoryStore> {
    let database_url = std::env::var("FOOTPRINT_DATABASE_URL")
        .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
    tracing::debug!(%database_url, "opening history store");

    let store = HistoryStore::connect(&database_url).await?;
    store.init().await.context("failed to migrate history database")?;
    Ok(store)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let factors = EmissionFactors::standard();

    match cli.command {
        Commands::InitDb => {
            open_store().await?;
            println!("Schema ready.");
        }
        Commands::Calculate {
            input,
            save,
            json,
            csv,
        } => {
            let record = input.validate().context("submission rejected")?;
            let result = calculator::compute(&record, &factors)
                .context("submission rejected")?;
            let tips = suggestions::suggest(&result);

            if json {
                let payload = serde_json::json!({
                    "input": record,
                    "result": result,
                    "periods": result.periods(),
                    "suggestions": tips,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else if csv {
                report::write_result_csv(std::io::stdout(), &result)?;
            } else {
                print!("{}", report::build_summary(&result, &tips));
            }

            if save {
                let store = open_store().await?;
                let entry = calculator::record(&store, record, &factors).await?;
                if !json && !csv {
                    println!();
                    println!("Saved to local history ({}).", entry.id);
                }
            }
        }
        Commands::Import { csv } => {
            let store = open_store().await?;
            let summary = db::import_csv(&store, &factors, &csv).await?;
            println!(
                "Saved {} estimates from {}.",
                summary.inserted,
                csv.display()
            );
            for (line, reason) in &summary.rejected {
                println!("- row {line} rejected: {reason}");
            }
        }
        Commands::History { limit } => {
            let store = open_store().await?;
            let saved = store.count().await?;

            if saved == 0 {
                println!("No history yet. Save an estimate to start tracking trends.");
                return Ok(());
            }

            let entries = store.list(limit).await?;
            println!("Showing {} of {saved} saved estimates:", entries.len());
            for entry in &entries {
                println!(
                    "- {} total {:.0} kg (transport {:.0}, electricity {:.0}, diet {:.0}, \
                     shopping {:.0})",
                    entry.recorded_at.format("%Y-%m-%d %H:%M"),
                    entry.result.total,
                    entry.result.transport,
                    entry.result.electricity,
                    entry.result.diet,
                    entry.result.shopping
                );
            }
        }
        Commands::Export { out, format } => {
            let store = open_store().await?;
            let entries = store.all().await?;
            report::export_history(&out, &entries, format)?;
            println!("Exported {} estimates to {}.", entries.len(), out.display());
        }
        Commands::Report { out } => {
            let store = open_store().await?;
            let history = store.all().await?;
            let Some(latest) = history.last() else {
                println!("No history yet. Save an estimate first.");
                return Ok(());
            };
            let report = report::build_report(latest, &history);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Factors => {
            print!("{}", report::factor_table(&factors));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FootprintError;

    #[test]
    fn negative_flags_reach_validation() {
        let args = ["footprint", "calculate", "--car-km-per-year", "-5"];
        let cli = Cli::try_parse_from(args).unwrap();
        let Commands::Calculate { input, .. } = cli.command else {
            panic!("expected the calculate command");
        };

        match input.validate() {
            Err(FootprintError::InvalidInput { field, .. }) => {
                assert_eq!(field, "car_km_per_year")
            }
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn calculate_flags_build_a_record() {
        let args = [
            "footprint",
            "calculate",
            "--car-km-per-year",
            "100",
            "--distance-unit",
            "miles",
            "--electricity-region",
            "custom",
            "--grid-factor",
            "0.5",
            "--monthly-shopping-spend",
            "90000",
            "--currency",
            "NGN",
            "--save",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        let Commands::Calculate { input, save, .. } = cli.command else {
            panic!("expected the calculate command");
        };

        assert!(save);
        let record = input.validate().unwrap();
        assert!((record.car_km_per_year - 160.9344).abs() < 1e-9);
        assert_eq!(record.monthly_shopping.amount, 90_000.0);
    }

    #[test]
    fn json_and_csv_output_are_exclusive() {
        let args = ["footprint", "calculate", "--json", "--csv"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn history_limit_must_be_positive() {
        assert!(Cli::try_parse_from(["footprint", "history", "--limit", "0"]).is_err());

        let cli = Cli::try_parse_from(["footprint", "history"]).unwrap();
        assert!(matches!(cli.command, Commands::History { limit: 10 }));
    }
}
