use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::checkpoint::{CheckpointStore, FileCheckpointStore};
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::fetcher::SessionPager;
use crate::normalize::{normalize_in, PaidSession};
use crate::provider::{mock::MockProvider, stripe::StripeProvider, CheckoutProvider};
use crate::snapshot::{snapshot_stamp, FileSnapshotWriter, SnapshotSink};

/// Link polled by demo runs when none is configured.
pub const DEMO_LINK: &str = "plink_demo";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Success,
    NoNewData,
    Error,
}

/// Outcome of one synchronization pass, shaped as the export endpoint's payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub status: SyncStatus,
    #[serde(default)]
    pub data: Vec<PaidSession>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<PathBuf>,
    /// Checkpoint stored at the end of the pass. Not part of the payload.
    #[serde(skip)]
    pub checkpoint: Option<i64>,
}

impl SyncReport {
    /// Maps a failed pass into the error payload: the top-level message plus
    /// the full cause chain.
    pub fn failure(err: &anyhow::Error) -> Self {
        Self {
            status: SyncStatus::Error,
            data: Vec::new(),
            message: Some(err.to_string()),
            trace: Some(format!("{:?}", err)),
            snapshot: None,
            checkpoint: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == SyncStatus::Error
    }
}

/// Sequences fetch, filter, snapshot and checkpoint for every payment link.
///
/// A pass is all-or-nothing: any fetch or storage failure propagates before
/// the snapshot and checkpoint writes, leaving the stored checkpoint as it was.
/// Callers must not run two passes against the same storage concurrently.
pub struct Synchronizer {
    provider: Arc<dyn CheckoutProvider>,
    checkpoints: Arc<dyn CheckpointStore>,
    snapshots: Arc<dyn SnapshotSink>,
    links: Vec<String>,
}

impl Synchronizer {
    pub fn new(
        provider: Arc<dyn CheckoutProvider>,
        checkpoints: Arc<dyn CheckpointStore>,
        snapshots: Arc<dyn SnapshotSink>,
        links: Vec<String>,
    ) -> Self {
        Self { provider, checkpoints, snapshots, links }
    }

    /// Wires the file-backed stores under the config's state dir to either the
    /// live provider or, with `mock`, the demo provider.
    pub fn from_config(config: &SyncConfig, mock: bool) -> Result<Self> {
        let provider: Arc<dyn CheckoutProvider> = if mock {
            Arc::new(MockProvider::new())
        } else {
            let key = config.require_api_key()?;
            Arc::new(StripeProvider::with_api_base(key.to_string(), config.api_base.clone()))
        };

        let mut links: Vec<String> = config.active_links().into_iter().map(str::to_string).collect();
        if links.is_empty() {
            if !mock {
                return Err(SyncError::Config(
                    "no payment links configured; set PLINK_CATEGORY_ONE or pass --link".to_string(),
                ));
            }
            links.push(DEMO_LINK.to_string());
        }

        let dir = config.state_dir(mock);
        Ok(Self::new(
            provider,
            Arc::new(FileCheckpointStore::in_dir(&dir)),
            Arc::new(FileSnapshotWriter::new(dir)),
            links,
        ))
    }

    pub fn links(&self) -> impl Iterator<Item = &str> {
        self.links.iter().map(|l| l.trim()).filter(|l| !l.is_empty())
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub async fn run(&self) -> Result<SyncReport> {
        self.run_at(Local::now()).await
    }

    pub async fn run_at<Tz>(&self, now: DateTime<Tz>) -> Result<SyncReport>
    where
        Tz: TimeZone + Send + Sync,
        Tz::Offset: std::fmt::Display + Send + Sync,
    {
        let since = self.checkpoints.read().await?;
        info!(
            provider = self.provider.name(),
            since,
            links = self.links().count(),
            "starting sync"
        );

        let tz = now.timezone();
        let mut records = Vec::new();
        for link in self.links() {
            let mut pager = SessionPager::new(self.provider.as_ref(), link);
            let mut seen = 0usize;
            let before = records.len();
            while let Some(page) = pager.next_page().await? {
                seen += page.len();
                records.extend(page.iter().filter_map(|s| normalize_in(s, link, since, &tz)));
            }
            debug!(link, seen, matched = records.len() - before, "link scanned");
        }

        let snapshot = if records.is_empty() {
            None
        } else {
            self.snapshots.write(&records, &snapshot_stamp(&now)).await?
        };

        let checkpoint = now.timestamp().max(since);
        self.checkpoints.write(checkpoint).await?;

        let status = if records.is_empty() {
            SyncStatus::NoNewData
        } else {
            SyncStatus::Success
        };
        info!(?status, records = records.len(), checkpoint, "sync finished");

        Ok(SyncReport {
            status,
            data: records,
            message: None,
            trace: None,
            snapshot,
            checkpoint: Some(checkpoint),
        })
    }
}
