//! Cron-invocable daily aggregation: rolls up one UTC day of raw occupancy
//! into hourly daily_load averages, defaulting to yesterday.
//!
//! Usage: aggregate [--config <path>] [--day YYYY-MM-DD]

use anyhow::{bail, Result};
use chrono::NaiveDate;
use log::info;
use roomwatch::aggregator::{default_target_day, DailyAggregator};
use roomwatch::config;
use roomwatch::db::DatabaseService;
use std::path::PathBuf;
use std::sync::Arc;

struct Args {
    config_path: Option<PathBuf>,
    day: Option<NaiveDate>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        config_path: None,
        day: None,
    };

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let Some(value) = iter.next() else {
                    bail!("--config requires a path");
                };
                args.config_path = Some(PathBuf::from(value));
            }
            "--day" => {
                let Some(value) = iter.next() else {
                    bail!("--day requires a value");
                };
                args.day = Some(
                    NaiveDate::parse_from_str(&value, "%Y-%m-%d")
                        .map_err(|e| anyhow::anyhow!("invalid --day value (want YYYY-MM-DD): {}", e))?,
                );
            }
            other => bail!("unknown argument: {}", other),
        }
    }

    Ok(args)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args = parse_args()?;
    let config = config::load_config(args.config_path.as_deref())?;

    let database = DatabaseService::connect(&config.database).await?;
    let aggregator = DailyAggregator::new(Arc::clone(&database.pool));

    let target_day = args.day.unwrap_or_else(default_target_day);
    let rollup = aggregator.aggregate_day(target_day).await?;

    info!(
        "Aggregated occupancy for {}: {} daily_load rows, {} raw rows retired",
        target_day, rollup.load_rows, rollup.raw_rows_deleted
    );

    Ok(())
}
