#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Batch aggregation pipeline: raw yearly incident partitions in,
//! three artifact tables out.
//!
//! One run reads every discovered partition, validates and cleans each
//! row, accumulates per-month and per-(month, type) counts, draws the
//! bounded per-year point sample, and persists the full artifact set in
//! one atomic replacement. Incomplete rows are dropped silently — only
//! a missing or unreadable input set aborts the run.

pub mod counts;
pub mod sampling;

use std::path::PathBuf;

use crime_trends_models::{Artifacts, RawIncident, SamplePointRow};
use crime_trends_store::{StoreError, artifact_db, partitions};
use serde::{Deserialize, Serialize};

use crate::counts::MonthlyCounts;

/// Errors that can abort an aggregation run.
#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    /// Raw input or artifact storage failure. No artifacts are written
    /// when a run fails.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Directories an aggregation run reads from and writes to.
#[derive(Debug, Clone)]
pub struct AggregateConfig {
    /// Directory holding `crime_<year>.parquet` partitions.
    pub raw_dir: PathBuf,
    /// Directory the artifact database is written into.
    pub artifacts_dir: PathBuf,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            raw_dir: crime_trends_store::paths::raw_dir(),
            artifacts_dir: crime_trends_store::paths::artifacts_dir(),
        }
    }
}

/// Outcome of one aggregation run, for operator logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateSummary {
    /// Raw partitions consumed.
    pub partitions: u64,
    /// Raw rows read across all partitions.
    pub rows_read: u64,
    /// Rows that passed validation.
    pub rows_kept: u64,
    /// Rows dropped for missing fields or unparseable timestamps.
    pub rows_dropped: u64,
    /// Rows in the `monthly_total` artifact.
    pub monthly_total_rows: u64,
    /// Rows in the `monthly_type` artifact.
    pub monthly_type_rows: u64,
    /// Rows in the `sample_points` artifact.
    pub sample_point_rows: u64,
}

/// Runs the full aggregation pipeline and persists the artifact set.
///
/// Partitions may be processed in any order; counts merge by summation
/// and all outputs are key-sorted, so discovery order never shows up in
/// the artifacts.
///
/// # Errors
///
/// Returns [`AggregateError`] if no partitions are found, a matched
/// partition cannot be read, or the artifact write fails. Nothing is
/// written unless the whole run succeeds.
pub fn run(config: &AggregateConfig) -> Result<AggregateSummary, AggregateError> {
    let discovered = partitions::discover_partitions(&config.raw_dir)?;
    log::info!(
        "Aggregating {} partitions from {}",
        discovered.len(),
        config.raw_dir.display()
    );

    let mut counts = MonthlyCounts::default();
    let mut sample_points: Vec<SamplePointRow> = Vec::new();
    let mut rows_read = 0u64;
    let mut rows_kept = 0u64;

    for (year, path) in &discovered {
        log::info!("Reading {} (year={year})", path.display());
        let raw = partitions::read_partition(path)?;
        let total = raw.len();

        let cleaned: Vec<_> = raw.into_iter().filter_map(RawIncident::clean).collect();
        let dropped = total - cleaned.len();
        if dropped > 0 {
            log::debug!("Partition {year}: dropped {dropped} incomplete rows");
        }

        counts.absorb(&cleaned);
        sample_points.extend(sampling::sample_year(&cleaned, *year));

        rows_read += total as u64;
        rows_kept += cleaned.len() as u64;
        log::info!("Partition {year}: kept {} of {total} rows", cleaned.len());
    }

    let (monthly_total, monthly_type) = counts.into_tables();

    // Canonical row order, shared with the artifact loader.
    sample_points.sort_by(|a, b| {
        a.year
            .cmp(&b.year)
            .then_with(|| a.date.cmp(&b.date))
            .then_with(|| a.primary_type.cmp(&b.primary_type))
            .then_with(|| a.latitude.total_cmp(&b.latitude))
            .then_with(|| a.longitude.total_cmp(&b.longitude))
    });

    let summary = AggregateSummary {
        partitions: discovered.len() as u64,
        rows_read,
        rows_kept,
        rows_dropped: rows_read - rows_kept,
        monthly_total_rows: monthly_total.len() as u64,
        monthly_type_rows: monthly_type.len() as u64,
        sample_point_rows: sample_points.len() as u64,
    };

    let artifacts = Artifacts {
        monthly_total,
        monthly_type,
        sample_points,
    };
    artifact_db::write_artifacts(&config.artifacts_dir, &artifacts, summary.partitions)?;

    log::info!(
        "Aggregation complete: {} rows kept of {} read across {} partitions",
        summary.rows_kept,
        summary.rows_read,
        summary.partitions,
    );

    Ok(summary)
}
