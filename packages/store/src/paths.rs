#![allow(clippy::module_name_repetitions)]
//! Canonical file paths for the crime-trends data directory.
//!
//! All paths are relative to the project root's `data/` directory.

use std::path::{Path, PathBuf};

/// Returns the workspace root directory.
///
/// Resolved at compile time from `CARGO_MANIFEST_DIR`.
///
/// # Panics
///
/// Panics if the project root cannot be resolved.
#[must_use]
pub fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .expect("Failed to find project root from CARGO_MANIFEST_DIR")
        .to_path_buf()
}

/// Returns the `data/` directory path.
#[must_use]
pub fn data_dir() -> PathBuf {
    project_root().join("data")
}

/// Returns the `data/raw/` directory holding yearly Parquet partitions.
#[must_use]
pub fn raw_dir() -> PathBuf {
    data_dir().join("raw")
}

/// Returns the `data/agg/` directory holding the aggregate artifacts.
#[must_use]
pub fn artifacts_dir() -> PathBuf {
    data_dir().join("agg")
}

/// Returns the live artifact `DuckDB` file inside an artifacts directory.
#[must_use]
pub fn artifact_db_path(artifacts_dir: &Path) -> PathBuf {
    artifacts_dir.join("artifacts.duckdb")
}

/// Returns the staging path the artifact `DuckDB` file is written to
/// before being renamed over the live file.
#[must_use]
pub fn artifact_staging_path(artifacts_dir: &Path) -> PathBuf {
    artifacts_dir.join("artifacts.duckdb.tmp")
}

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
