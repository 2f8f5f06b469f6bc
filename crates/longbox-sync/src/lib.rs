//! Longbox Sync - pull/push synchronization engine
//!
//! Provides:
//! - Full-table pulls merged into the local catalog by last-writer-wins
//! - Per-item pushes with coalescing of overlapping saves
//! - Chunked bulk pushes with per-batch failure isolation
//! - Observable sync status
//!
//! ## Modules
//!
//! - [`engine`] - `SyncEngine` orchestrating pull, push and delete
//! - [`status`] - `SyncStatusPublisher` broadcasting `SyncState`
//! - [`backend`] - `SyncBackend` strategy (remote or local-only)
//! - [`service`] - `CatalogService`, the mutation entry point for collaborators
//! - [`scheduler`] - periodic and on-demand pull trigger

pub mod backend;
pub mod engine;
pub mod scheduler;
pub mod service;
pub mod status;

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;

use longbox_core::domain::ItemId;
use longbox_store::LocalStore;

pub use backend::{NullSyncBackend, RemoteSyncBackend, SyncBackend};
pub use engine::{PullReport, PushOutcome, SyncEngine};
pub use scheduler::{SyncScheduler, SyncTrigger};
pub use service::CatalogService;
pub use status::{OperationGuard, SyncStatusPublisher};

/// The local catalog shared between the service and the engine
///
/// Pulls hold the lock only while merging, never across network calls.
pub type SharedStore = Arc<Mutex<LocalStore>>;

/// Errors that can occur during synchronization operations
#[derive(Debug, Error)]
pub enum SyncError {
    /// The engine was shut down while the operation was in progress
    #[error("sync cancelled")]
    Cancelled,

    /// The remote gateway reported a failure
    #[error("remote error: {0:#}")]
    Remote(anyhow::Error),

    /// The item does not exist in the local catalog
    #[error("item not found: {0}")]
    NotFound(ItemId),

    /// A valuation that cannot be stored or sent, such as NaN
    #[error("invalid value: {0}")]
    InvalidValue(f64),
}

impl SyncError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SyncError::Cancelled)
    }
}
