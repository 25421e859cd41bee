#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Operator CLI for the crime trends engine.
//!
//! `aggregate` runs the batch pipeline from raw yearly partitions to
//! the artifact database; `query` answers one filtered view request
//! against the stored artifacts and prints JSON; `stats` prints the
//! artifact bookkeeping and data bounds.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use crime_trends_aggregate::AggregateConfig;
use crime_trends_query::handle::ArtifactHandle;
use crime_trends_query_models::{DateRange, QueryParams, TypeFilter};

#[derive(Parser)]
#[command(name = "crime-trends", about = "Crime trends aggregation & query engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate raw yearly partitions into the artifact database
    Aggregate {
        /// Directory holding `crime_<year>.parquet` partitions
        #[arg(long)]
        raw_dir: Option<PathBuf>,

        /// Directory the artifact database is written into
        #[arg(long)]
        artifacts_dir: Option<PathBuf>,
    },
    /// Run one filtered query against the stored artifacts
    Query {
        /// Inclusive start day (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,

        /// Inclusive end day (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,

        /// Comma-separated category labels; omit for no restriction
        #[arg(long)]
        types: Option<String>,

        /// Include the full map point table in the output
        #[arg(long)]
        map_points: bool,

        /// Directory holding the artifact database
        #[arg(long)]
        artifacts_dir: Option<PathBuf>,
    },
    /// Print artifact metadata, date bounds, and category labels
    Stats {
        /// Directory holding the artifact database
        #[arg(long)]
        artifacts_dir: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Aggregate {
            raw_dir,
            artifacts_dir,
        } => aggregate(raw_dir, artifacts_dir),
        Commands::Query {
            start,
            end,
            types,
            map_points,
            artifacts_dir,
        } => run_query(start, end, types.as_deref(), map_points, artifacts_dir),
        Commands::Stats { artifacts_dir } => stats(artifacts_dir),
    }
}

fn aggregate(
    raw_dir: Option<PathBuf>,
    artifacts_dir: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let defaults = AggregateConfig::default();
    let config = AggregateConfig {
        raw_dir: raw_dir.unwrap_or(defaults.raw_dir),
        artifacts_dir: artifacts_dir.unwrap_or(defaults.artifacts_dir),
    };

    let summary = crime_trends_aggregate::run(&config)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn run_query(
    start: NaiveDate,
    end: NaiveDate,
    types: Option<&str>,
    map_points: bool,
    artifacts_dir: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let artifacts_dir =
        artifacts_dir.unwrap_or_else(crime_trends_store::paths::artifacts_dir);

    let params = QueryParams {
        range: DateRange::new(start, end)?,
        types: parse_types(types),
    };

    let handle = ArtifactHandle::load(artifacts_dir)?;
    let output = crime_trends_query::query(&handle.snapshot(), &params);

    let mut doc = serde_json::json!({
        "summary": output.summary(),
        "trendSeries": output.trend_series,
        "topTypes": output.top_types,
    });
    if map_points {
        doc["mapPoints"] = serde_json::to_value(&output.map_points)?;
    }
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}

/// Parses a comma-separated `--types` value; an omitted or blank value
/// means no restriction.
fn parse_types(types: Option<&str>) -> TypeFilter {
    TypeFilter::from_selection(
        types
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string),
    )
}

fn stats(artifacts_dir: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let artifacts_dir =
        artifacts_dir.unwrap_or_else(crime_trends_store::paths::artifacts_dir);

    let meta = crime_trends_store::artifact_db::load_meta(&artifacts_dir)?;
    let artifacts = crime_trends_store::artifact_db::load_artifacts(&artifacts_dir)?;

    let bounds = artifacts.date_bounds().map(|(min, max)| {
        serde_json::json!({
            "minDate": min.format("%Y-%m-%d %H:%M:%S").to_string(),
            "maxDate": max.format("%Y-%m-%d %H:%M:%S").to_string(),
        })
    });

    let doc = serde_json::json!({
        "meta": meta,
        "dateBounds": bounds,
        "primaryTypes": artifacts.primary_types(),
    });
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_type_selections() {
        assert!(parse_types(None).is_all());
        assert!(parse_types(Some("")).is_all());
        assert!(parse_types(Some(" , ")).is_all());

        let filter = parse_types(Some("THEFT, BATTERY"));
        assert!(filter.matches("THEFT"));
        assert!(filter.matches("BATTERY"));
        assert!(!filter.matches("ARSON"));
    }
}
