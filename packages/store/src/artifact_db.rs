//! Aggregate artifact `DuckDB` storage.
//!
//! All three artifact tables plus a `_meta` key/value table live in one
//! `DuckDB` file. A run writes the whole set to a staging file and
//! renames it over the live file, so a reader opening the live path sees
//! either the previous complete set or the new one, never a mix.

use std::path::Path;

use crime_trends_models::{
    Artifacts, MonthlyTotalRow, MonthlyTypeRow, SamplePointRow,
};
use duckdb::Connection;
use serde::{Deserialize, Serialize};

use crate::StoreError;

/// Number of rows per INSERT chunk (`DuckDB` handles large batches well).
const CHUNK_SIZE: usize = 5_000;

/// Current artifact schema version. Bump on backward-incompatible
/// changes to the table shapes.
const SCHEMA_VERSION: u32 = 1;

/// Bookkeeping recorded in the `_meta` table at write time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactMeta {
    /// Artifact schema version.
    pub schema_version: u32,
    /// RFC 3339 timestamp of the aggregator run that wrote this set.
    pub generated_at: Option<String>,
    /// Rows in `monthly_total`.
    pub monthly_total_rows: u64,
    /// Rows in `monthly_type`.
    pub monthly_type_rows: u64,
    /// Rows in `sample_points`.
    pub sample_point_rows: u64,
    /// Number of raw partitions the run consumed.
    pub partitions: u64,
}

fn create_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "CREATE TABLE monthly_total (
            month DATE NOT NULL,
            count BIGINT NOT NULL
        );

        CREATE TABLE monthly_type (
            month DATE NOT NULL,
            primary_type TEXT NOT NULL,
            count BIGINT NOT NULL
        );

        CREATE TABLE sample_points (
            date TIMESTAMP NOT NULL,
            primary_type TEXT NOT NULL,
            latitude DOUBLE NOT NULL,
            longitude DOUBLE NOT NULL,
            year INTEGER NOT NULL
        );

        CREATE TABLE _meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );",
    )?;

    Ok(())
}

/// Writes a full artifact set, replacing any prior version atomically
/// from the reader's perspective.
///
/// # Errors
///
/// Returns [`StoreError`] if the staging file cannot be written or the
/// rename over the live file fails. The live file is untouched on error.
pub fn write_artifacts(
    artifacts_dir: &Path,
    artifacts: &Artifacts,
    partitions: u64,
) -> Result<(), StoreError> {
    crate::paths::ensure_dir(artifacts_dir)?;

    let staging = crate::paths::artifact_staging_path(artifacts_dir);
    if staging.exists() {
        std::fs::remove_file(&staging)?;
    }

    let conn = Connection::open(&staging)?;
    create_schema(&conn)?;

    insert_monthly_total(&conn, &artifacts.monthly_total)?;
    insert_monthly_type(&conn, &artifacts.monthly_type)?;
    insert_sample_points(&conn, &artifacts.sample_points)?;

    set_meta(&conn, "schema_version", &SCHEMA_VERSION.to_string())?;
    set_meta(&conn, "generated_at", &chrono::Utc::now().to_rfc3339())?;
    set_meta(
        &conn,
        "monthly_total_rows",
        &artifacts.monthly_total.len().to_string(),
    )?;
    set_meta(
        &conn,
        "monthly_type_rows",
        &artifacts.monthly_type.len().to_string(),
    )?;
    set_meta(
        &conn,
        "sample_point_rows",
        &artifacts.sample_points.len().to_string(),
    )?;
    set_meta(&conn, "partitions", &partitions.to_string())?;

    // Close before the rename so the WAL is checkpointed into the file.
    drop(conn);

    let live = crate::paths::artifact_db_path(artifacts_dir);
    std::fs::rename(&staging, &live)?;

    log::info!(
        "Wrote artifacts to {}: {} monthly totals, {} monthly type rows, {} sample points",
        live.display(),
        artifacts.monthly_total.len(),
        artifacts.monthly_type.len(),
        artifacts.sample_points.len(),
    );

    Ok(())
}

fn insert_monthly_total(conn: &Connection, rows: &[MonthlyTotalRow]) -> Result<(), StoreError> {
    for chunk in rows.chunks(CHUNK_SIZE) {
        let mut sql = String::from("INSERT INTO monthly_total (month, count) VALUES ");
        for (i, _) in chunk.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push_str("(?, ?)");
        }

        let mut stmt = conn.prepare(&sql)?;
        let mut param_idx = 1usize;
        for row in chunk {
            stmt.raw_bind_parameter(param_idx, row.month.format("%Y-%m-%d").to_string())?;
            stmt.raw_bind_parameter(param_idx + 1, i64::try_from(row.count).unwrap_or(i64::MAX))?;
            param_idx += 2;
        }
        stmt.raw_execute()?;
    }

    Ok(())
}

fn insert_monthly_type(conn: &Connection, rows: &[MonthlyTypeRow]) -> Result<(), StoreError> {
    for chunk in rows.chunks(CHUNK_SIZE) {
        let mut sql =
            String::from("INSERT INTO monthly_type (month, primary_type, count) VALUES ");
        for (i, _) in chunk.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push_str("(?, ?, ?)");
        }

        let mut stmt = conn.prepare(&sql)?;
        let mut param_idx = 1usize;
        for row in chunk {
            stmt.raw_bind_parameter(param_idx, row.month.format("%Y-%m-%d").to_string())?;
            stmt.raw_bind_parameter(param_idx + 1, &row.primary_type)?;
            stmt.raw_bind_parameter(param_idx + 2, i64::try_from(row.count).unwrap_or(i64::MAX))?;
            param_idx += 3;
        }
        stmt.raw_execute()?;
    }

    Ok(())
}

fn insert_sample_points(conn: &Connection, rows: &[SamplePointRow]) -> Result<(), StoreError> {
    for chunk in rows.chunks(CHUNK_SIZE) {
        let mut sql = String::from(
            "INSERT INTO sample_points (date, primary_type, latitude, longitude, year) VALUES ",
        );
        for (i, _) in chunk.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push_str("(?, ?, ?, ?, ?)");
        }

        let mut stmt = conn.prepare(&sql)?;
        let mut param_idx = 1usize;
        for row in chunk {
            stmt.raw_bind_parameter(
                param_idx,
                row.date.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
            )?;
            stmt.raw_bind_parameter(param_idx + 1, &row.primary_type)?;
            stmt.raw_bind_parameter(param_idx + 2, row.latitude)?;
            stmt.raw_bind_parameter(param_idx + 3, row.longitude)?;
            stmt.raw_bind_parameter(param_idx + 4, row.year)?;
            param_idx += 5;
        }
        stmt.raw_execute()?;
    }

    Ok(())
}

/// Loads the full artifact set from the live artifact file.
///
/// Tables are read in key order, matching the order the aggregator
/// persists them in.
///
/// # Errors
///
/// Returns [`StoreError::MissingArtifacts`] if no artifact file exists,
/// or [`StoreError`] if a table cannot be read.
pub fn load_artifacts(artifacts_dir: &Path) -> Result<Artifacts, StoreError> {
    let path = crate::paths::artifact_db_path(artifacts_dir);
    if !path.exists() {
        return Err(StoreError::MissingArtifacts { path });
    }

    let conn = Connection::open(&path)?;

    let mut stmt = conn.prepare(
        "SELECT month::TEXT, count FROM monthly_total ORDER BY month",
    )?;
    let raw_totals = stmt.query_map([], |row| {
        let month: String = row.get(0)?;
        let count: i64 = row.get(1)?;
        Ok((month, count))
    })?;
    let mut monthly_total = Vec::new();
    for row in raw_totals {
        let (month, count) = row?;
        monthly_total.push(MonthlyTotalRow {
            month: crate::parse_date(&month)?,
            count: u64::try_from(count).unwrap_or(0),
        });
    }

    let mut stmt = conn.prepare(
        "SELECT month::TEXT, primary_type, count
         FROM monthly_type
         ORDER BY month, primary_type",
    )?;
    let raw_types = stmt.query_map([], |row| {
        let month: String = row.get(0)?;
        let primary_type: String = row.get(1)?;
        let count: i64 = row.get(2)?;
        Ok((month, primary_type, count))
    })?;
    let mut monthly_type = Vec::new();
    for row in raw_types {
        let (month, primary_type, count) = row?;
        monthly_type.push(MonthlyTypeRow {
            month: crate::parse_date(&month)?,
            primary_type,
            count: u64::try_from(count).unwrap_or(0),
        });
    }

    let mut stmt = conn.prepare(
        "SELECT date::TEXT, primary_type, latitude, longitude, year
         FROM sample_points
         ORDER BY year, date, primary_type, latitude, longitude",
    )?;
    let raw_points = stmt.query_map([], |row| {
        let date: String = row.get(0)?;
        let primary_type: String = row.get(1)?;
        let latitude: f64 = row.get(2)?;
        let longitude: f64 = row.get(3)?;
        let year: i32 = row.get(4)?;
        Ok((date, primary_type, latitude, longitude, year))
    })?;
    let mut sample_points = Vec::new();
    for row in raw_points {
        let (date, primary_type, latitude, longitude, year) = row?;
        let date = crate::parse_timestamp(&date).ok_or_else(|| StoreError::Conversion {
            message: format!("Invalid sample point timestamp: {date:?}"),
        })?;
        sample_points.push(SamplePointRow {
            date,
            primary_type,
            latitude,
            longitude,
            year,
        });
    }

    Ok(Artifacts {
        monthly_total,
        monthly_type,
        sample_points,
    })
}

/// Loads the `_meta` bookkeeping for the live artifact set.
///
/// # Errors
///
/// Returns [`StoreError::MissingArtifacts`] if no artifact file exists,
/// or [`StoreError`] if the table cannot be read.
pub fn load_meta(artifacts_dir: &Path) -> Result<ArtifactMeta, StoreError> {
    let path = crate::paths::artifact_db_path(artifacts_dir);
    if !path.exists() {
        return Err(StoreError::MissingArtifacts { path });
    }

    let conn = Connection::open(&path)?;

    let parse_count = |value: Option<String>| -> u64 {
        value.and_then(|v| v.parse().ok()).unwrap_or(0)
    };

    Ok(ArtifactMeta {
        schema_version: get_meta(&conn, "schema_version")?
            .and_then(|v| v.parse().ok())
            .unwrap_or(0),
        generated_at: get_meta(&conn, "generated_at")?,
        monthly_total_rows: parse_count(get_meta(&conn, "monthly_total_rows")?),
        monthly_type_rows: parse_count(get_meta(&conn, "monthly_type_rows")?),
        sample_point_rows: parse_count(get_meta(&conn, "sample_point_rows")?),
        partitions: parse_count(get_meta(&conn, "partitions")?),
    })
}

/// Gets a metadata value from the `_meta` table.
///
/// # Errors
///
/// Returns [`StoreError`] if the query fails.
fn get_meta(conn: &Connection, key: &str) -> Result<Option<String>, StoreError> {
    let mut stmt = conn.prepare("SELECT value FROM _meta WHERE key = ?")?;
    let result = stmt.query_row([key], |row| row.get(0));
    match result {
        Ok(v) => Ok(Some(v)),
        Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(StoreError::DuckDb(e)),
    }
}

/// Sets a metadata value in the `_meta` table.
fn set_meta(conn: &Connection, key: &str, value: &str) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO _meta (key, value) VALUES (?, ?)
         ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value",
        duckdb::params![key, value],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use chrono::NaiveDate;
    use crime_trends_models::SamplePointRow;

    use super::*;

    fn test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "crime_trends_artifact_db_{name}_{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn month(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    fn sample_artifacts() -> Artifacts {
        Artifacts {
            monthly_total: vec![
                MonthlyTotalRow {
                    month: month(2020, 1),
                    count: 100,
                },
                MonthlyTotalRow {
                    month: month(2020, 2),
                    count: 150,
                },
            ],
            monthly_type: vec![
                MonthlyTypeRow {
                    month: month(2020, 1),
                    primary_type: "BATTERY".to_string(),
                    count: 60,
                },
                MonthlyTypeRow {
                    month: month(2020, 1),
                    primary_type: "THEFT".to_string(),
                    count: 40,
                },
                MonthlyTypeRow {
                    month: month(2020, 2),
                    primary_type: "THEFT".to_string(),
                    count: 150,
                },
            ],
            sample_points: vec![
                SamplePointRow {
                    date: month(2020, 1).and_hms_opt(8, 30, 0).unwrap(),
                    primary_type: "THEFT".to_string(),
                    latitude: 41.88,
                    longitude: -87.63,
                    year: 2020,
                },
                SamplePointRow {
                    date: month(2020, 2).and_hms_opt(23, 15, 30).unwrap(),
                    primary_type: "BATTERY".to_string(),
                    latitude: 41.75,
                    longitude: -87.60,
                    year: 2020,
                },
            ],
        }
    }

    #[test]
    fn round_trips_artifacts() {
        let dir = test_dir("round_trip");
        let artifacts = sample_artifacts();

        write_artifacts(&dir, &artifacts, 1).unwrap();
        let loaded = load_artifacts(&dir).unwrap();

        assert_eq!(loaded, artifacts);
        assert!(!crate::paths::artifact_staging_path(&dir).exists());
    }

    #[test]
    fn rewrite_replaces_prior_set() {
        let dir = test_dir("rewrite");
        let artifacts = sample_artifacts();
        write_artifacts(&dir, &artifacts, 1).unwrap();

        let smaller = Artifacts {
            monthly_total: vec![MonthlyTotalRow {
                month: month(2021, 6),
                count: 7,
            }],
            monthly_type: vec![MonthlyTypeRow {
                month: month(2021, 6),
                primary_type: "ARSON".to_string(),
                count: 7,
            }],
            sample_points: vec![],
        };
        write_artifacts(&dir, &smaller, 1).unwrap();

        let loaded = load_artifacts(&dir).unwrap();
        assert_eq!(loaded, smaller);
    }

    #[test]
    fn records_meta() {
        let dir = test_dir("meta");
        write_artifacts(&dir, &sample_artifacts(), 3).unwrap();

        let meta = load_meta(&dir).unwrap();
        assert_eq!(meta.schema_version, SCHEMA_VERSION);
        assert!(meta.generated_at.is_some());
        assert_eq!(meta.monthly_total_rows, 2);
        assert_eq!(meta.monthly_type_rows, 3);
        assert_eq!(meta.sample_point_rows, 2);
        assert_eq!(meta.partitions, 3);
    }

    #[test]
    fn missing_artifacts_is_explicit() {
        let dir = test_dir("missing");
        assert!(matches!(
            load_artifacts(&dir),
            Err(StoreError::MissingArtifacts { .. })
        ));
        assert!(matches!(
            load_meta(&dir),
            Err(StoreError::MissingArtifacts { .. })
        ));
    }
}
