use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::SyncError;
use crate::provider::stripe::DEFAULT_API_BASE;

pub const API_KEY_VAR: &str = "STRIPE_LIVE_SECRET_KEY";
pub const LINK_VARS: &[&str] = &["PLINK_CATEGORY_ONE", "PLINK_CATEGORY_TWO", "PLINK_CATEGORY_THREE"];
pub const DATA_DIR_VAR: &str = "PAYLINK_SYNC_DATA_DIR";
/// Subdirectory of the data dir that holds demo (`--mock`) state.
pub const MOCK_STATE_DIR: &str = "mock";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub api_key: String,
    /// Payment links to poll, in export order. Blank entries are skipped.
    pub payment_links: Vec<String>,
    /// Holds the checkpoint and the snapshot artifacts.
    pub data_dir: PathBuf,
    pub api_base: String,
    pub poll_interval_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            payment_links: Vec::new(),
            data_dir: default_data_dir(),
            api_base: DEFAULT_API_BASE.to_string(),
            poll_interval_secs: 60,
        }
    }
}

impl SyncConfig {
    /// Overlays values from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup(API_KEY_VAR).filter(|k| !k.is_empty()) {
            self.api_key = key;
        }

        let links: Vec<Option<String>> = LINK_VARS.iter().map(|var| lookup(*var)).collect();
        if links.iter().any(Option::is_some) {
            self.payment_links = links.into_iter().map(Option::unwrap_or_default).collect();
        }

        if let Some(dir) = lookup(DATA_DIR_VAR).filter(|d| !d.is_empty()) {
            self.data_dir = PathBuf::from(dir);
        }
    }

    pub fn active_links(&self) -> Vec<&str> {
        self.payment_links
            .iter()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .collect()
    }

    pub fn require_api_key(&self) -> std::result::Result<&str, SyncError> {
        if self.api_key.is_empty() {
            return Err(SyncError::Config(format!(
                "no provider API key; set {} or run `configure --api-key`",
                API_KEY_VAR
            )));
        }
        Ok(&self.api_key)
    }

    /// Where the checkpoint and snapshots live. Demo runs get their own
    /// subdirectory so they never touch the live low-water-mark or exports.
    pub fn state_dir(&self, mock: bool) -> PathBuf {
        if mock {
            self.data_dir.join(MOCK_STATE_DIR)
        } else {
            self.data_dir.clone()
        }
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join("paylink-sync.log")
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("paylink-sync")
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("paylink-sync")
        .join("config.json")
}

pub fn load_config() -> Option<SyncConfig> {
    load_config_from(&config_path())
}

pub fn load_config_from(path: &Path) -> Option<SyncConfig> {
    let data = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&data).ok()
}

pub fn save_config(config: &SyncConfig) -> Result<PathBuf> {
    let path = config_path();
    save_config_to(config, &path)?;
    Ok(path)
}

pub fn save_config_to(config: &SyncConfig, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let data = serde_json::to_string_pretty(config)?;
    std::fs::write(path, data)?;
    Ok(())
}
