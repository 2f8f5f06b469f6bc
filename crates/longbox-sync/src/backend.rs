//! Sync backend strategy
//!
//! The catalog talks to a [`SyncBackend`] chosen at startup from
//! `sync.backend`: [`RemoteSyncBackend`] wraps a [`SyncEngine`], and
//! [`NullSyncBackend`] keeps the catalog local-only.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use longbox_core::domain::{CatalogItem, ItemId};
use longbox_core::ports::BatchReport;

use crate::engine::{PullReport, PushOutcome, SyncEngine};
use crate::status::SyncStatusPublisher;
use crate::{SharedStore, SyncError};

/// Where local changes go and remote changes come from
#[async_trait]
pub trait SyncBackend: Send + Sync {
    /// Short name for logs and status output
    fn name(&self) -> &'static str;

    async fn pull(&self, store: &SharedStore) -> Result<PullReport, SyncError>;

    async fn push_single(&self, item: CatalogItem) -> Result<PushOutcome, SyncError>;

    async fn push_all(&self, items: Vec<CatalogItem>) -> Result<BatchReport, SyncError>;

    async fn delete(&self, id: ItemId) -> Result<(), SyncError>;

    fn status(&self) -> Arc<SyncStatusPublisher>;

    /// Cancels outstanding network work
    fn shutdown(&self);
}

// ============================================================================
// NullSyncBackend
// ============================================================================

/// Local-only backend; every operation succeeds without doing anything
#[derive(Default)]
pub struct NullSyncBackend {
    status: Arc<SyncStatusPublisher>,
}

impl NullSyncBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SyncBackend for NullSyncBackend {
    fn name(&self) -> &'static str {
        "none"
    }

    async fn pull(&self, _store: &SharedStore) -> Result<PullReport, SyncError> {
        debug!("Local-only backend: pull skipped");
        Ok(PullReport::default())
    }

    async fn push_single(&self, _item: CatalogItem) -> Result<PushOutcome, SyncError> {
        Ok(PushOutcome::Skipped)
    }

    async fn push_all(&self, _items: Vec<CatalogItem>) -> Result<BatchReport, SyncError> {
        Ok(BatchReport::default())
    }

    async fn delete(&self, _id: ItemId) -> Result<(), SyncError> {
        Ok(())
    }

    fn status(&self) -> Arc<SyncStatusPublisher> {
        Arc::clone(&self.status)
    }

    fn shutdown(&self) {}
}

// ============================================================================
// RemoteSyncBackend
// ============================================================================

/// Backend that syncs through a [`SyncEngine`]
pub struct RemoteSyncBackend {
    engine: Arc<SyncEngine>,
}

impl RemoteSyncBackend {
    pub fn new(engine: Arc<SyncEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<SyncEngine> {
        &self.engine
    }
}

#[async_trait]
impl SyncBackend for RemoteSyncBackend {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn pull(&self, store: &SharedStore) -> Result<PullReport, SyncError> {
        self.engine.pull(store).await
    }

    async fn push_single(&self, item: CatalogItem) -> Result<PushOutcome, SyncError> {
        self.engine.push_single(item).await
    }

    async fn push_all(&self, items: Vec<CatalogItem>) -> Result<BatchReport, SyncError> {
        self.engine.push_all(&items).await
    }

    async fn delete(&self, id: ItemId) -> Result<(), SyncError> {
        self.engine.delete(id).await
    }

    fn status(&self) -> Arc<SyncStatusPublisher> {
        Arc::clone(self.engine.status())
    }

    fn shutdown(&self) {
        self.engine.shutdown();
    }
}
