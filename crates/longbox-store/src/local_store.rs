//! Local catalog store
//!
//! `LocalStore` is the authoritative copy of the catalog. All reads are
//! served from memory; every mutation updates memory synchronously, bumps
//! the content revision, and hands a snapshot to the [`SnapshotWriter`].
//!
//! ## Loading
//!
//! - Missing snapshot: empty catalog
//! - Unreadable or corrupt snapshot: empty catalog, a warning, and a copy of
//!   the bad file at `<name>.corrupt` so the next write cannot destroy it

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use longbox_core::domain::{CatalogItem, ItemId};

use crate::writer::{SnapshotWriter, SnapshotWriterHandle};

/// Quiet period before a pending snapshot is written
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(800);

/// In-memory catalog backed by a JSON snapshot file
pub struct LocalStore {
    path: PathBuf,
    items: HashMap<ItemId, CatalogItem>,
    writer: Option<SnapshotWriterHandle>,
    worker: Option<JoinHandle<()>>,
    writes: Arc<AtomicU64>,
    revision: watch::Sender<u64>,
}

impl LocalStore {
    /// Loads the snapshot at `path` and starts its writer task
    ///
    /// Never fails: an absent or damaged snapshot yields an empty catalog.
    pub async fn open(path: impl Into<PathBuf>, debounce: Duration) -> Self {
        let path = path.into();
        let items = load(&path).await;
        info!(path = %path.display(), items = items.len(), "Catalog loaded");

        let (writer, handle) = SnapshotWriter::new(path.clone(), debounce);
        let worker = tokio::spawn(writer.run());
        let (revision, _) = watch::channel(0);

        Self {
            path,
            items,
            writes: handle.write_counter(),
            writer: Some(handle),
            worker: Some(worker),
            revision,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Overwrites the whole catalog without touching timestamps
    pub fn replace(&mut self, items: Vec<CatalogItem>) {
        self.items = items.into_iter().map(|item| (item.id(), item)).collect();
        debug!(items = self.items.len(), "Catalog replaced");
        self.changed();
    }

    /// Inserts or overwrites an item, stamping `modified_at` to now
    ///
    /// Returns the stamped copy, which is what should be pushed remotely.
    pub fn upsert(&mut self, mut item: CatalogItem) -> CatalogItem {
        item.touch();
        self.items.insert(item.id(), item.clone());
        self.changed();
        item
    }

    /// Applies `mutate` to an existing item and stamps it
    ///
    /// Returns `None` without scheduling a write when the id is unknown.
    pub fn update<F>(&mut self, id: &ItemId, mutate: F) -> Option<CatalogItem>
    where
        F: FnOnce(&mut CatalogItem),
    {
        let item = self.items.get_mut(id)?;
        mutate(item);
        item.touch();
        let updated = item.clone();
        self.changed();
        Some(updated)
    }

    /// Removes an item, returning it if it existed
    pub fn remove(&mut self, id: &ItemId) -> Option<CatalogItem> {
        let removed = self.items.remove(id)?;
        self.changed();
        Some(removed)
    }

    // ------------------------------------------------------------------
    // Readers
    // ------------------------------------------------------------------

    pub fn get(&self, id: &ItemId) -> Option<&CatalogItem> {
        self.items.get(id)
    }

    /// All items ordered by `created_at`, then id
    pub fn items(&self) -> Vec<CatalogItem> {
        let mut items: Vec<CatalogItem> = self.items.values().cloned().collect();
        items.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.id().cmp(&b.id()))
        });
        items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Monotonic counter bumped on every content change
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Receiver notified on every content change
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Waits until any pending snapshot is on disk
    pub async fn flush(&self) {
        if let Some(writer) = &self.writer {
            if let Err(e) = writer.flush().await {
                warn!(error = %e, "Snapshot flush failed");
            }
        }
    }

    /// Flushes and stops the writer task
    ///
    /// Later mutations still apply in memory but are no longer persisted.
    pub async fn close(&mut self) {
        // Dropping the last handle makes the writer persist and exit
        self.writer.take();
        if let Some(worker) = self.worker.take() {
            if let Err(e) = worker.await {
                warn!(error = %e, "Snapshot writer task failed");
            }
        }
        info!(path = %self.path.display(), "Catalog closed");
    }

    /// Number of snapshot files written since open
    pub fn writes_completed(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    fn changed(&mut self) {
        self.revision.send_modify(|r| *r += 1);
        match &self.writer {
            Some(writer) => {
                if let Err(e) = writer.schedule(self.items.values().cloned().collect()) {
                    warn!(error = %e, "Could not schedule snapshot write");
                }
            }
            None => debug!("Catalog closed; change kept in memory only"),
        }
    }
}

/// Reads a snapshot, quarantining it if it cannot be parsed
async fn load(path: &Path) -> HashMap<ItemId, CatalogItem> {
    let data = match tokio::fs::read(path).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return HashMap::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Catalog snapshot unreadable; starting empty");
            quarantine(path).await;
            return HashMap::new();
        }
    };

    match serde_json::from_slice::<Vec<CatalogItem>>(&data) {
        Ok(items) => items.into_iter().map(|item| (item.id(), item)).collect(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Catalog snapshot corrupt; starting empty");
            quarantine(path).await;
            HashMap::new()
        }
    }
}

/// Path the damaged snapshot is copied to
pub fn corrupt_path_for(path: &Path) -> PathBuf {
    let mut p = path.as_os_str().to_owned();
    p.push(".corrupt");
    PathBuf::from(p)
}

async fn quarantine(path: &Path) {
    let target = corrupt_path_for(path);
    match tokio::fs::copy(path, &target).await {
        Ok(_) => info!(path = %target.display(), "Preserved unreadable snapshot"),
        Err(e) => warn!(error = %e, "Could not preserve unreadable snapshot"),
    }
}
