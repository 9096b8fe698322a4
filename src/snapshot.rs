use async_trait::async_trait;
use chrono::{DateTime, TimeZone};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::checkpoint::write_atomic;
use crate::error::{Result, SyncError};
use crate::normalize::PaidSession;

pub const SNAPSHOT_PREFIX: &str = "paid_sessions_";
pub const SNAPSHOT_SUFFIX: &str = ".json";

#[async_trait]
pub trait SnapshotSink: Send + Sync {
    /// Persists `records` as one artifact named after `taken_at` (minute
    /// precision). Returns `None` without touching storage when `records` is
    /// empty.
    async fn write(&self, records: &[PaidSession], taken_at: &str) -> Result<Option<PathBuf>>;
}

/// Formats the minute-precision stamp that names a snapshot.
pub fn snapshot_stamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format("%Y-%m-%d_%H-%M").to_string()
}

pub fn snapshot_file_name(stamp: &str) -> String {
    format!("{}{}{}", SNAPSHOT_PREFIX, stamp, SNAPSHOT_SUFFIX)
}

pub struct FileSnapshotWriter {
    dir: PathBuf,
}

impl FileSnapshotWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl SnapshotSink for FileSnapshotWriter {
    async fn write(&self, records: &[PaidSession], taken_at: &str) -> Result<Option<PathBuf>> {
        if records.is_empty() {
            return Ok(None);
        }

        let path = self.dir.join(snapshot_file_name(taken_at));
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            warn!(path = %path.display(), "snapshot from the same minute exists and will be replaced");
        }

        let data = serde_json::to_vec_pretty(records)?;
        write_atomic(&path, &data).await?;
        info!(path = %path.display(), records = records.len(), "snapshot written");
        Ok(Some(path))
    }
}

/// Lists snapshot artifacts in `dir`, oldest first.
pub async fn list_snapshots(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(SyncError::storage(dir, e)),
    };

    let mut snapshots = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(|e| SyncError::storage(dir, e))? {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(SNAPSHOT_PREFIX) && name.ends_with(SNAPSHOT_SUFFIX) {
            snapshots.push(entry.path());
        }
    }
    snapshots.sort();
    Ok(snapshots)
}

/// Reads back the records of one snapshot artifact.
pub async fn read_snapshot(path: &Path) -> Result<Vec<PaidSession>> {
    let data = tokio::fs::read(path).await.map_err(|e| SyncError::storage(path, e))?;
    serde_json::from_slice(&data).map_err(|source| SyncError::Corrupt { path: path.to_path_buf(), source })
}
