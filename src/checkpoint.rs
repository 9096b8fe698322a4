use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Result, SyncError};

pub const CHECKPOINT_FILE: &str = "last_run.json";

/// The synchronization low-water-mark: sessions created at or before this
/// Unix timestamp have already been exported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Checkpoint {
    #[serde(default)]
    pub last_run: i64,
}

#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Returns the stored checkpoint, or zero if none was ever written.
    async fn read(&self) -> Result<i64>;
    async fn write(&self, last_run: i64) -> Result<()>;
}

pub struct FileCheckpointStore {
    path: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(CHECKPOINT_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn read(&self) -> Result<i64> {
        let data = match tokio::fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(SyncError::storage(&self.path, e)),
        };
        let checkpoint: Checkpoint = serde_json::from_slice(&data)
            .map_err(|source| SyncError::Corrupt { path: self.path.clone(), source })?;
        Ok(checkpoint.last_run)
    }

    async fn write(&self, last_run: i64) -> Result<()> {
        let data = serde_json::to_vec(&Checkpoint { last_run })?;
        write_atomic(&self.path, &data).await?;
        debug!(path = %self.path.display(), last_run, "checkpoint written");
        Ok(())
    }
}

/// Writes `data` to a sibling temp file and renames it over `path`, creating
/// the parent directory if needed. The temp file is removed if any step fails,
/// and on Unix the directory entry is synced once the rename lands.
pub(crate) async fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path.parent().filter(|d| !d.as_os_str().is_empty());
    if let Some(dir) = dir {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| SyncError::storage(dir, e))?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    if let Err(e) = write_then_rename(&tmp, path, data).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e);
    }

    match dir {
        Some(dir) => sync_dir(dir).await,
        None => Ok(()),
    }
}

#[cfg(unix)]
async fn sync_dir(dir: &Path) -> Result<()> {
    let handle = tokio::fs::File::open(dir)
        .await
        .map_err(|e| SyncError::storage(dir, e))?;
    handle.sync_all().await.map_err(|e| SyncError::storage(dir, e))
}

#[cfg(not(unix))]
async fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}

async fn write_then_rename(tmp: &Path, path: &Path, data: &[u8]) -> Result<()> {
    let mut file = tokio::fs::File::create(tmp)
        .await
        .map_err(|e| SyncError::storage(tmp, e))?;
    tokio::io::AsyncWriteExt::write_all(&mut file, data)
        .await
        .map_err(|e| SyncError::storage(tmp, e))?;
    file.sync_all().await.map_err(|e| SyncError::storage(tmp, e))?;
    drop(file);

    tokio::fs::rename(tmp, path)
        .await
        .map_err(|e| SyncError::storage(path, e))
}
