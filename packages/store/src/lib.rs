#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `DuckDB`-backed storage for the crime-trends engine.
//!
//! Raw yearly partitions are Parquet files read through `DuckDB`'s
//! `read_parquet` with an explicit column list, so only the four columns
//! the aggregator needs ever leave disk. Aggregate artifacts live in a
//! single `DuckDB` file with three tables plus a `_meta` table; the file
//! is written to a staging path and renamed into place so readers see
//! either the old complete set or the new one.

pub mod artifact_db;
pub mod partitions;
pub mod paths;

use chrono::{NaiveDate, NaiveDateTime};

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// `DuckDB` operation error.
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No raw partitions matched the discovery pattern. The aggregator
    /// treats this as fatal: there is no partial-aggregate fallback.
    #[error("No raw partitions matched: {pattern}")]
    NoPartitions {
        /// The glob-style pattern that matched nothing.
        pattern: String,
    },

    /// The artifact database does not exist yet. Queries require a
    /// completed aggregator run.
    #[error("Artifact database not found: {}", path.display())]
    MissingArtifacts {
        /// Expected location of the artifact `DuckDB` file.
        path: std::path::PathBuf,
    },

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

/// Parses a `DuckDB` timestamp text representation.
///
/// `DuckDB`'s `::TEXT` cast can produce several formats depending on the
/// stored precision:
/// - `2024-01-15 10:30:00` (no fractional seconds)
/// - `2024-01-15 10:30:00.123` (fractional seconds)
/// - `2024-01-15 10:30:00+00` (with timezone)
/// - `2024-01-15 10:30:00.123+00` (both)
/// - `2024-01-15` (a bare date, taken as midnight)
///
/// Tries each in order and returns the first successful parse. `None`
/// means the value is unusable; callers coerce that to a dropped row,
/// not an error.
#[must_use]
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    use chrono::DateTime;

    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%z") {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%z") {
        return Some(dt.naive_utc());
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(naive);
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }

    log::debug!("Unparseable timestamp: {s:?}");
    None
}

/// Parses a `DuckDB` `DATE` text representation (`2024-01-15`).
///
/// # Errors
///
/// Returns [`StoreError::Conversion`] if the value is not a valid date.
/// Unlike incident timestamps, artifact month keys are written by this
/// crate, so a malformed value is a storage fault rather than dirty data.
pub fn parse_date(s: &str) -> Result<NaiveDate, StoreError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| StoreError::Conversion {
        message: format!("Invalid date {s:?}: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_duckdb_text_variants() {
        for s in [
            "2024-01-15 10:30:00",
            "2024-01-15 10:30:00.123",
            "2024-01-15 10:30:00+00",
            "2024-01-15 10:30:00.123+00",
        ] {
            let parsed = parse_timestamp(s).unwrap();
            assert_eq!(parsed.date(), NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        }

        assert_eq!(
            parse_timestamp("2024-01-15"),
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap().and_hms_opt(0, 0, 0)
        );
    }

    #[test]
    fn rejects_garbage_timestamps() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("not a date").is_none());
        assert!(parse_timestamp("2024-13-01 00:00:00").is_none());
    }

    #[test]
    fn parses_dates() {
        assert_eq!(
            parse_date("2020-02-01").unwrap(),
            NaiveDate::from_ymd_opt(2020, 2, 1).unwrap()
        );
        assert!(parse_date("2020/02/01").is_err());
    }
}
