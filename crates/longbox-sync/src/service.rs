//! Catalog service
//!
//! [`CatalogService`] is the entry point collaborators use to change the
//! catalog. Every mutation lands in the local store first; the matching
//! remote push or delete is then launched as a detached task, so callers
//! never wait on the network.

use std::sync::Arc;

use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use longbox_core::domain::{CatalogItem, ItemId, ValuePoint};
use longbox_core::ports::BatchReport;

use crate::backend::SyncBackend;
use crate::engine::PullReport;
use crate::{SharedStore, SyncError};

/// Local-first coordinator over a store and a sync backend
pub struct CatalogService {
    store: SharedStore,
    backend: Arc<dyn SyncBackend>,
    tasks: TaskTracker,
}

impl CatalogService {
    pub fn new(store: SharedStore, backend: Arc<dyn SyncBackend>) -> Self {
        Self {
            store,
            backend,
            tasks: TaskTracker::new(),
        }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn backend(&self) -> &Arc<dyn SyncBackend> {
        &self.backend
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Saves an item locally and pushes it in the background
    ///
    /// Returns the stored copy with its fresh `modified_at`.
    pub async fn save(&self, item: CatalogItem) -> CatalogItem {
        let stored = self.store.lock().await.upsert(item);
        self.spawn_push(stored.clone());
        stored
    }

    /// Removes an item locally and deletes its remote copy in the background
    pub async fn remove(&self, id: ItemId) -> Option<CatalogItem> {
        let removed = self.store.lock().await.remove(&id)?;

        let backend = Arc::clone(&self.backend);
        self.tasks.spawn(async move {
            if let Err(e) = backend.delete(id).await {
                warn!(item_id = %id, error = %e, "Background delete failed");
            }
        });
        Some(removed)
    }

    /// Appends a valuation to an item's history
    ///
    /// Non-finite values are rejected before the item is touched.
    pub async fn record_value(&self, id: ItemId, point: ValuePoint) -> Result<CatalogItem, SyncError> {
        if !point.value.is_finite() {
            return Err(SyncError::InvalidValue(point.value));
        }
        let updated = self
            .store
            .lock()
            .await
            .update(&id, |item| item.record_value(point))
            .ok_or(SyncError::NotFound(id))?;
        self.spawn_push(updated.clone());
        Ok(updated)
    }

    /// Removes the most recent valuation, returning it
    ///
    /// An item with an empty history is left untouched and not pushed.
    pub async fn undo_last_value(&self, id: ItemId) -> Result<Option<ValuePoint>, SyncError> {
        let mut store = self.store.lock().await;
        let has_history = store
            .get(&id)
            .map(|item| !item.value_history().is_empty())
            .ok_or(SyncError::NotFound(id))?;
        if !has_history {
            return Ok(None);
        }

        let mut removed = None;
        let updated = store
            .update(&id, |item| removed = item.undo_last_value())
            .ok_or(SyncError::NotFound(id))?;
        drop(store);

        self.spawn_push(updated);
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub async fn items(&self) -> Vec<CatalogItem> {
        self.store.lock().await.items()
    }

    pub async fn get(&self, id: &ItemId) -> Option<CatalogItem> {
        self.store.lock().await.get(id).cloned()
    }

    // ------------------------------------------------------------------
    // Sync
    // ------------------------------------------------------------------

    /// Pulls the remote table into the local catalog now
    pub async fn sync_now(&self) -> Result<PullReport, SyncError> {
        self.backend.pull(&self.store).await
    }

    /// Pushes the whole local catalog in batches
    pub async fn push_everything(&self) -> Result<BatchReport, SyncError> {
        let items = self.items().await;
        info!(items = items.len(), "Pushing entire catalog");
        self.backend.push_all(items).await
    }

    /// Waits for every background push and delete launched so far
    pub async fn drain(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }

    /// Number of background tasks still running
    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }

    /// Cancels network work, waits for background tasks and flushes the store
    ///
    /// Call [`drain`](Self::drain) first to let pending pushes finish.
    pub async fn shutdown(&self) {
        self.backend.shutdown();
        self.drain().await;
        self.store.lock().await.close().await;
        info!("Catalog service stopped");
    }

    fn spawn_push(&self, item: CatalogItem) {
        let backend = Arc::clone(&self.backend);
        self.tasks.spawn(async move {
            let id = item.id();
            match backend.push_single(item).await {
                Ok(outcome) => debug!(item_id = %id, ?outcome, "Background push finished"),
                Err(e) => warn!(item_id = %id, error = %e, "Background push failed"),
            }
        });
    }
}
