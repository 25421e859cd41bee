//! Shared artifact handle with atomic snapshot swap.
//!
//! Constructed once at process start and passed by reference into query
//! call sites: `snapshot()` hands out a cheap `Arc` clone of the
//! current set, and `reload()` swaps in a freshly loaded set after an
//! aggregator run. Queries in flight keep the snapshot they started
//! with, so a refresh never exposes a half-replaced artifact set.

use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use crime_trends_models::Artifacts;
use crime_trends_store::{StoreError, artifact_db};

/// Handle to the currently loaded artifact set.
#[derive(Debug)]
pub struct ArtifactHandle {
    artifacts_dir: PathBuf,
    current: RwLock<Arc<Artifacts>>,
}

impl ArtifactHandle {
    /// Loads the artifact set from `artifacts_dir` and wraps it in a
    /// handle.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the artifact database is missing or
    /// unreadable.
    pub fn load(artifacts_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let artifacts_dir = artifacts_dir.into();
        let artifacts = artifact_db::load_artifacts(&artifacts_dir)?;
        log::info!(
            "Loaded artifacts from {}: {} months, {} sample points",
            artifacts_dir.display(),
            artifacts.monthly_total.len(),
            artifacts.sample_points.len(),
        );

        Ok(Self {
            artifacts_dir,
            current: RwLock::new(Arc::new(artifacts)),
        })
    }

    /// Returns the current artifact snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Artifacts> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Reloads the artifact set from disk and swaps it in atomically.
    ///
    /// On error the previous snapshot stays in place.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the artifact database cannot be read.
    pub fn reload(&self) -> Result<(), StoreError> {
        let artifacts = Arc::new(artifact_db::load_artifacts(&self.artifacts_dir)?);
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = artifacts;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use crime_trends_models::MonthlyTotalRow;

    use super::*;

    fn test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "crime_trends_handle_{name}_{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn artifacts_with_total(count: u64) -> Artifacts {
        Artifacts {
            monthly_total: vec![MonthlyTotalRow {
                month: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
                count,
            }],
            monthly_type: vec![],
            sample_points: vec![],
        }
    }

    #[test]
    fn reload_swaps_while_old_snapshots_survive() {
        let dir = test_dir("reload");
        artifact_db::write_artifacts(&dir, &artifacts_with_total(1), 1).unwrap();

        let handle = ArtifactHandle::load(&dir).unwrap();
        let before = handle.snapshot();
        assert_eq!(before.monthly_total[0].count, 1);

        artifact_db::write_artifacts(&dir, &artifacts_with_total(2), 1).unwrap();
        handle.reload().unwrap();

        // The old snapshot is unchanged; new snapshots see the new set.
        assert_eq!(before.monthly_total[0].count, 1);
        assert_eq!(handle.snapshot().monthly_total[0].count, 2);
    }

    #[test]
    fn load_fails_without_artifacts() {
        let dir = test_dir("missing");
        assert!(matches!(
            ArtifactHandle::load(&dir),
            Err(StoreError::MissingArtifacts { .. })
        ));
    }
}
