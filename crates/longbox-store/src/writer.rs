//! Debounced snapshot persistence.
//!
//! Provides `SnapshotWriter`, a tokio task that owns all disk writes of the
//! catalog snapshot. Mutations hand it a full copy of the catalog; bursts
//! are coalesced so only the last copy reaches disk once the channel has
//! been quiet for the debounce period.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use longbox_core::domain::CatalogItem;

use crate::atomic::write_atomic;
use crate::error::StoreError;

// ============================================================================
// PersistCommand enum
// ============================================================================

/// Messages understood by the writer task
#[derive(Debug)]
pub enum PersistCommand {
    /// Replace the pending snapshot; restarts the debounce window
    Save(Vec<CatalogItem>),
    /// Write any pending snapshot now and acknowledge
    Flush(oneshot::Sender<()>),
}

// ============================================================================
// SnapshotWriterHandle
// ============================================================================

/// Handle for sending snapshots to the writer task
///
/// Sending never blocks, so synchronous catalog mutations can schedule
/// persistence directly.
#[derive(Debug, Clone)]
pub struct SnapshotWriterHandle {
    tx: mpsc::UnboundedSender<PersistCommand>,
    writes_completed: Arc<AtomicU64>,
}

impl SnapshotWriterHandle {
    /// Schedules `items` to be written after the debounce period
    pub fn schedule(&self, items: Vec<CatalogItem>) -> Result<(), StoreError> {
        self.tx
            .send(PersistCommand::Save(items))
            .map_err(|_| StoreError::WriterStopped)
    }

    /// Writes any pending snapshot immediately and waits for it
    pub async fn flush(&self) -> Result<(), StoreError> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(PersistCommand::Flush(tx))
            .map_err(|_| StoreError::WriterStopped)?;
        rx.await.map_err(|_| StoreError::WriterStopped)
    }

    /// Number of snapshot files successfully written so far
    pub fn writes_completed(&self) -> u64 {
        self.writes_completed.load(Ordering::SeqCst)
    }

    /// Shared write counter; outlives the handle
    pub fn write_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.writes_completed)
    }
}

// ============================================================================
// SnapshotWriter
// ============================================================================

/// Owns the snapshot file and performs every write to it
///
/// ```text
/// ┌────────────┐   PersistCommand   ┌────────────────┐  temp + rename  ┌──────────────┐
/// │ LocalStore │ ─────────────────► │ SnapshotWriter │ ──────────────► │ catalog.json │
/// └────────────┘                    └────────────────┘                 └──────────────┘
/// ```
pub struct SnapshotWriter {
    rx: mpsc::UnboundedReceiver<PersistCommand>,
    path: PathBuf,
    debounce: Duration,
    writes_completed: Arc<AtomicU64>,
}

impl SnapshotWriter {
    /// Creates a writer for `path`
    ///
    /// The caller must spawn the writer with `run()`.
    pub fn new(path: PathBuf, debounce: Duration) -> (Self, SnapshotWriterHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let writes_completed = Arc::new(AtomicU64::new(0));

        let writer = Self {
            rx,
            path,
            debounce,
            writes_completed: Arc::clone(&writes_completed),
        };
        let handle = SnapshotWriterHandle {
            tx,
            writes_completed,
        };

        (writer, handle)
    }

    /// Runs until every handle is dropped, then writes whatever is pending
    pub async fn run(mut self) {
        info!(path = %self.path.display(), "Snapshot writer started");
        let mut pending: Option<Vec<CatalogItem>> = None;

        loop {
            let command = if pending.is_some() {
                match tokio::time::timeout(self.debounce, self.rx.recv()).await {
                    Ok(command) => command,
                    Err(_quiet) => {
                        if let Some(items) = pending.take() {
                            self.persist(items).await;
                        }
                        continue;
                    }
                }
            } else {
                self.rx.recv().await
            };

            match command {
                Some(PersistCommand::Save(items)) => {
                    debug!(items = items.len(), "Snapshot scheduled");
                    pending = Some(items);
                }
                Some(PersistCommand::Flush(reply)) => {
                    if let Some(items) = pending.take() {
                        self.persist(items).await;
                    }
                    let _ = reply.send(());
                }
                None => {
                    if let Some(items) = pending.take() {
                        self.persist(items).await;
                    }
                    break;
                }
            }
        }

        info!("Snapshot writer stopped (all handles dropped)");
    }

    async fn persist(&self, items: Vec<CatalogItem>) {
        let result = async {
            let data = serde_json::to_vec(&items)?;
            write_atomic(&self.path, &data).await
        }
        .await;

        match result {
            Ok(()) => {
                let total = self.writes_completed.fetch_add(1, Ordering::SeqCst) + 1;
                debug!(items = items.len(), writes = total, "Snapshot written");
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to write snapshot; next mutation will retry"
                );
            }
        }
    }
}
