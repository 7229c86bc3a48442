//! Job-scoped filesystem layout and retention.
//!
//! Each job owns three isolated directory subtrees (raw downloads, annotated
//! copies, packaged artifacts); nothing outside a job's subtree is ever touched
//! on its behalf, so concurrent jobs need no filesystem locking.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::config::StorageConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Raw,
    Annotated,
    Artifacts,
}

impl Category {
    pub const ALL: [Self; 3] = [Self::Raw, Self::Annotated, Self::Artifacts];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Annotated => "annotated",
            Self::Artifacts => "artifacts",
        }
    }
}

#[derive(Clone)]
pub struct JobStorage {
    root: PathBuf,

    raw_retention_days: u32,
    annotated_retention_days: u32,
    artifact_retention_days: u32,
}

impl JobStorage {
    #[must_use]
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            root: PathBuf::from(&config.root),
            raw_retention_days: config.raw_retention_days,
            annotated_retention_days: config.annotated_retention_days,
            artifact_retention_days: config.artifact_retention_days,
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic path for a job's directory in one category. Pure: no I/O,
    /// directories are created lazily by `ensure_dir` on first write.
    #[must_use]
    pub fn path_for(&self, job_id: i32, category: Category) -> PathBuf {
        self.root
            .join(category.as_str())
            .join(format!("job_{job_id}"))
    }

    pub async fn ensure_dir(&self, job_id: i32, category: Category) -> Result<PathBuf> {
        let path = self.path_for(job_id, category);
        fs::create_dir_all(&path).await?;
        Ok(path)
    }

    /// Removes raw and annotated data for a job; artifacts only when asked.
    /// Idempotent: absent directories count zero files and produce no error.
    pub async fn cleanup_job(&self, job_id: i32, include_artifacts: bool) -> Result<CleanupStats> {
        let mut stats = CleanupStats::default();

        for category in Category::ALL {
            if category == Category::Artifacts && !include_artifacts {
                continue;
            }
            let path = self.path_for(job_id, category);
            self.remove_dir_counted(&path, &mut stats).await;
        }

        if stats.files_deleted > 0 {
            info!(
                "Cleaned up job {}: deleted {} files, freed {}",
                job_id,
                stats.files_deleted,
                stats.bytes_freed_human()
            );
        }

        Ok(stats)
    }

    /// Retention sweep: removes per-job directories whose modification time
    /// exceeds the category's retention window. Windows are independent, so
    /// raw downloads can age out while the annotated copies remain.
    pub async fn cleanup_older_than_retention(&self) -> Result<CleanupStats> {
        let mut stats = CleanupStats::default();

        for category in Category::ALL {
            let retention_days = match category {
                Category::Raw => self.raw_retention_days,
                Category::Annotated => self.annotated_retention_days,
                Category::Artifacts => self.artifact_retention_days,
            };

            let cutoff = chrono::Utc::now() - chrono::Duration::days(i64::from(retention_days));
            let category_root = self.root.join(category.as_str());

            if !category_root.exists() {
                continue;
            }

            let mut entries = fs::read_dir(&category_root).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if !path.is_dir() {
                    continue;
                }

                if let Ok(metadata) = fs::metadata(&path).await
                    && let Ok(modified) = metadata.modified()
                {
                    let modified_time: chrono::DateTime<chrono::Utc> = modified.into();

                    if modified_time < cutoff {
                        debug!("Retention: removing {:?}", path);
                        self.remove_dir_counted(&path, &mut stats).await;
                    }
                }
            }
        }

        if stats.files_deleted > 0 {
            info!(
                "Retention sweep: deleted {} files, freed {}",
                stats.files_deleted,
                stats.bytes_freed_human()
            );
        }

        Ok(stats)
    }

    /// Single walk over the tree; O(total files), fine for this scale.
    pub fn stats(&self) -> StorageStats {
        let mut stats = StorageStats::default();

        for category in Category::ALL {
            let category_root = self.root.join(category.as_str());
            let entry = match category {
                Category::Raw => &mut stats.raw,
                Category::Annotated => &mut stats.annotated,
                Category::Artifacts => &mut stats.artifacts,
            };

            if !category_root.exists() {
                continue;
            }

            for item in walkdir::WalkDir::new(&category_root)
                .min_depth(1)
                .into_iter()
                .filter_map(std::result::Result::ok)
            {
                if item.depth() == 1 && item.path().is_dir() {
                    entry.job_count += 1;
                } else if item.path().is_file()
                    && let Ok(metadata) = item.metadata()
                {
                    entry.file_count += 1;
                    entry.total_bytes += metadata.len();
                }
            }
        }

        stats
    }

    async fn remove_dir_counted(&self, path: &Path, stats: &mut CleanupStats) {
        if !path.exists() {
            return;
        }

        for item in walkdir::WalkDir::new(path)
            .into_iter()
            .filter_map(std::result::Result::ok)
        {
            if item.path().is_file()
                && let Ok(metadata) = item.metadata()
            {
                stats.files_deleted += 1;
                stats.bytes_freed += metadata.len();
            }
        }

        if let Err(e) = fs::remove_dir_all(path).await {
            warn!("Failed to delete {:?}: {}", path, e);
            stats.errors += 1;
        }
    }
}

#[derive(Debug, Default)]
pub struct CleanupStats {
    pub files_deleted: usize,
    pub bytes_freed: u64,
    pub errors: usize,
}

impl CleanupStats {
    #[must_use]
    pub fn bytes_freed_human(&self) -> String {
        format_bytes(self.bytes_freed)
    }
}

#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct CategoryStats {
    pub job_count: usize,
    pub file_count: usize,
    pub total_bytes: u64,
}

#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct StorageStats {
    pub raw: CategoryStats,
    pub annotated: CategoryStats,
    pub artifacts: CategoryStats,
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    #[allow(clippy::cast_precision_loss)]
    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} bytes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_storage() -> JobStorage {
        let config = StorageConfig {
            root: std::env::temp_dir()
                .join(format!("minutarr-storage-test-{}", uuid::Uuid::new_v4()))
                .to_string_lossy()
                .to_string(),
            ..Default::default()
        };
        JobStorage::new(&config)
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(500), "500 bytes");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(1_048_576), "1.00 MB");
        assert_eq!(format_bytes(1_073_741_824), "1.00 GB");
    }

    #[test]
    fn test_path_for_is_deterministic_and_isolated() {
        let storage = temp_storage();
        let a = storage.path_for(1, Category::Raw);
        let b = storage.path_for(1, Category::Raw);
        assert_eq!(a, b);

        let annotated = storage.path_for(1, Category::Annotated);
        assert_ne!(a, annotated);

        let other_job = storage.path_for(2, Category::Raw);
        assert_ne!(a, other_job);

        // Pure: no directory was created by path_for.
        assert!(!a.exists());
    }

    #[tokio::test]
    async fn test_cleanup_job_is_idempotent() {
        let storage = temp_storage();

        let raw = storage.ensure_dir(7, Category::Raw).await.unwrap();
        tokio::fs::write(raw.join("minutes.pdf"), b"x").await.unwrap();

        let first = storage.cleanup_job(7, false).await.unwrap();
        assert_eq!(first.files_deleted, 1);
        assert_eq!(first.errors, 0);

        let second = storage.cleanup_job(7, false).await.unwrap();
        assert_eq!(second.files_deleted, 0);
        assert_eq!(second.errors, 0);
    }

    #[tokio::test]
    async fn test_cleanup_job_spares_artifacts_by_default() {
        let storage = temp_storage();

        let artifacts = storage.ensure_dir(3, Category::Artifacts).await.unwrap();
        tokio::fs::write(artifacts.join("job_3.zip"), b"zip")
            .await
            .unwrap();

        storage.cleanup_job(3, false).await.unwrap();
        assert!(artifacts.join("job_3.zip").exists());

        let with_artifacts = storage.cleanup_job(3, true).await.unwrap();
        assert_eq!(with_artifacts.files_deleted, 1);
        assert!(!artifacts.exists());
    }

    #[tokio::test]
    async fn test_stats_counts_per_category() {
        let storage = temp_storage();

        let raw = storage.ensure_dir(1, Category::Raw).await.unwrap();
        tokio::fs::write(raw.join("a.pdf"), b"aaaa").await.unwrap();
        tokio::fs::write(raw.join("b.pdf"), b"bb").await.unwrap();
        storage.ensure_dir(2, Category::Raw).await.unwrap();

        let stats = storage.stats();
        assert_eq!(stats.raw.job_count, 2);
        assert_eq!(stats.raw.file_count, 2);
        assert_eq!(stats.raw.total_bytes, 6);
        assert_eq!(stats.annotated.file_count, 0);
    }
}
