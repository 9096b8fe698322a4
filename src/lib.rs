//! Incremental export of paid checkout sessions from a payment provider.
//!
//! A [`sync::Synchronizer`] pages through each configured payment link's
//! session history, keeps the sessions paid since the stored checkpoint,
//! writes them to a timestamped snapshot and advances the checkpoint.

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod logging;
pub mod normalize;
pub mod provider;
pub mod snapshot;
pub mod sync;

pub use checkpoint::{CheckpointStore, FileCheckpointStore};
pub use error::SyncError;
pub use normalize::PaidSession;
pub use provider::{CheckoutProvider, CheckoutSession, SessionPage};
pub use snapshot::{FileSnapshotWriter, SnapshotSink};
pub use sync::{SyncReport, SyncStatus, Synchronizer};
