//! Raw yearly partition discovery and reads.
//!
//! Partitions are Parquet files named `crime_<year>.parquet` inside the
//! raw data directory. Discovery enumerates the directory; reads go
//! through `DuckDB`'s `read_parquet` with an explicit column list so
//! unrelated columns are never materialized.

use std::path::{Path, PathBuf};

use crime_trends_models::RawIncident;
use duckdb::Connection;

use crate::StoreError;

/// Filename prefix for raw partitions.
const PARTITION_PREFIX: &str = "crime_";

/// Filename extension for raw partitions.
const PARTITION_EXT: &str = "parquet";

/// Discovers raw yearly partitions in `raw_dir`.
///
/// Returns `(year, path)` pairs sorted by year. Files that do not match
/// the `crime_<year>.parquet` pattern are ignored.
///
/// # Errors
///
/// Returns [`StoreError::NoPartitions`] if the directory is missing or
/// contains no matching files. A run with no input is fatal — there is
/// no partial-aggregate fallback.
pub fn discover_partitions(raw_dir: &Path) -> Result<Vec<(i32, PathBuf)>, StoreError> {
    let mut partitions = Vec::new();

    if let Ok(entries) = std::fs::read_dir(raw_dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some(PARTITION_EXT)
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
                && let Some(year) = stem.strip_prefix(PARTITION_PREFIX)
                && let Ok(year) = year.parse::<i32>()
            {
                partitions.push((year, path));
            }
        }
    }

    if partitions.is_empty() {
        return Err(StoreError::NoPartitions {
            pattern: format!(
                "{}/{PARTITION_PREFIX}<year>.{PARTITION_EXT}",
                raw_dir.display()
            ),
        });
    }

    partitions.sort_by_key(|(year, _)| *year);
    Ok(partitions)
}

/// Reads one raw partition into [`RawIncident`] rows.
///
/// Only the four required columns are selected. Timestamps are read
/// through a `::TEXT` cast and parsed leniently; unparseable values
/// become `None` and the row is later dropped by validation.
///
/// # Errors
///
/// Returns [`StoreError::DuckDb`] if the file cannot be read or lacks
/// any of the required columns. A matched-but-unreadable partition is a
/// fatal input error, not a skippable row problem.
pub fn read_partition(path: &Path) -> Result<Vec<RawIncident>, StoreError> {
    let conn = Connection::open_in_memory()?;

    let escaped = path.display().to_string().replace('\'', "''");
    let sql = format!(
        "SELECT date::TEXT, primary_type, latitude, longitude
         FROM read_parquet('{escaped}')"
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| {
        let date_text: Option<String> = row.get(0)?;
        let primary_type: Option<String> = row.get(1)?;
        let latitude: Option<f64> = row.get(2)?;
        let longitude: Option<f64> = row.get(3)?;
        Ok((date_text, primary_type, latitude, longitude))
    })?;

    let mut incidents = Vec::new();
    for row in rows {
        let (date_text, primary_type, latitude, longitude) = row?;
        incidents.push(RawIncident {
            date: date_text.as_deref().and_then(crate::parse_timestamp),
            primary_type,
            latitude,
            longitude,
        });
    }

    Ok(incidents)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "crime_trends_partitions_{name}_{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn discovers_sorted_years_and_ignores_noise() {
        let dir = test_dir("discover");
        for name in [
            "crime_2021.parquet",
            "crime_2019.parquet",
            "crime_2020.parquet",
            "notes.txt",
            "crime_abc.parquet",
            "other_2020.parquet",
        ] {
            std::fs::write(dir.join(name), b"").unwrap();
        }

        let partitions = discover_partitions(&dir).unwrap();
        let years: Vec<i32> = partitions.iter().map(|(y, _)| *y).collect();
        assert_eq!(years, vec![2019, 2020, 2021]);
    }

    #[test]
    fn empty_directory_is_fatal() {
        let dir = test_dir("empty");
        assert!(matches!(
            discover_partitions(&dir),
            Err(StoreError::NoPartitions { .. })
        ));

        let missing = dir.join("does_not_exist");
        assert!(matches!(
            discover_partitions(&missing),
            Err(StoreError::NoPartitions { .. })
        ));
    }

    #[test]
    fn reads_parquet_and_coerces_bad_timestamps() {
        let dir = test_dir("read");
        let path = dir.join("crime_2020.parquet");
        let escaped = path.display().to_string().replace('\'', "''");

        // Build a tiny partition with one good row, one null-riddled row,
        // and one row whose date cannot be parsed.
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(&format!(
            "COPY (
                SELECT
                    date,
                    primary_type,
                    latitude::DOUBLE AS latitude,
                    longitude::DOUBLE AS longitude
                FROM (VALUES
                    ('2020-03-15 22:10:00', 'THEFT', 41.88, -87.63),
                    (NULL, NULL, NULL, NULL),
                    ('garbage', 'BATTERY', 41.70, -87.60)
                ) AS t(date, primary_type, latitude, longitude)
            ) TO '{escaped}' (FORMAT PARQUET)"
        ))
        .unwrap();

        let rows = read_partition(&path).unwrap();
        assert_eq!(rows.len(), 3);

        assert!(rows[0].date.is_some());
        assert_eq!(rows[0].primary_type.as_deref(), Some("THEFT"));

        assert!(rows[1].date.is_none());
        assert!(rows[1].primary_type.is_none());

        // Unparseable timestamp coerced to None; the rest of the row
        // survives so validation can drop it.
        assert!(rows[2].date.is_none());
        assert_eq!(rows[2].primary_type.as_deref(), Some("BATTERY"));
    }

    #[test]
    fn unreadable_partition_errors() {
        let dir = test_dir("unreadable");
        let path = dir.join("crime_2020.parquet");
        std::fs::write(&path, b"not parquet").unwrap();

        assert!(read_partition(&path).is_err());
    }
}
