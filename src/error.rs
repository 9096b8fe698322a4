use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("fetching sessions for payment link {link} failed")]
    Fetch {
        link: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("storage error at {}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unreadable data in {}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("serialization error: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("configuration error: {0}")]
    Config(String),
}

impl SyncError {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SyncError::Storage { path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
