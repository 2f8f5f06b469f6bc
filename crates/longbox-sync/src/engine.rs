//! Synchronization engine
//!
//! The [`SyncEngine`] moves catalog data between the authoritative
//! [`LocalStore`](longbox_store::LocalStore) and the remote record table.
//!
//! ## Pull
//!
//! 1. Bootstrap the remote namespace once (remembered in sync metadata)
//! 2. Fetch every page of the table (cancellable)
//! 3. Decode records, skipping the ones that do not decode
//! 4. Under the store lock: merge with the current local items and replace
//!    the catalog when the merge changed anything
//!
//! The store lock is taken only after the fetch, so local saves made while
//! the network call is in flight are part of the merge input and are never
//! lost.
//!
//! ## Push
//!
//! Single-item pushes are coalesced per id: while a push for an id is in
//! flight, further pushes for it only replace a queued copy, which is sent
//! once the current push completes. Copies older than the one in flight, the
//! one queued or the last one pushed are dropped, since detached push tasks
//! may reach the engine out of order. Pushes are never retried
//! automatically.
//!
//! Remote failures only move the published `SyncState`; local data is
//! never rolled back.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use longbox_assets::AssetPipeline;
use longbox_conflict::{ConflictResolver, MergeStats};
use longbox_core::codec::RecordCodec;
use longbox_core::domain::{AssetRef, CatalogItem, ItemId};
use longbox_core::ports::{BatchReport, IRemoteGateway, RemoteRecord};
use longbox_store::SyncMetadataStore;

use crate::status::SyncStatusPublisher;
use crate::{SharedStore, SyncError};

// ============================================================================
// Reports
// ============================================================================

/// Summary of a completed pull
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PullReport {
    /// Distinct records returned by the remote table
    pub fetched: usize,
    /// Records that failed to decode and were skipped
    pub skipped: usize,
    pub merge: MergeStats,
    /// Whether the local catalog was replaced
    pub applied: bool,
    pub duration_ms: u64,
}

/// Result of [`SyncEngine::push_single`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PushOutcome {
    /// The item (and any saves coalesced into it) reached the remote table
    Pushed,
    /// Another push for the same id was in flight; this copy will follow it
    Coalesced,
    /// A newer copy of the item was already pushed or is queued
    Superseded,
    /// No remote is configured
    Skipped,
}

// ============================================================================
// SyncEngine
// ============================================================================

/// Bookkeeping for an id whose push is running
struct InFlight {
    /// `modified_at` of the copy being pushed
    sending: DateTime<Utc>,
    /// Latest newer copy saved meanwhile
    queued: Option<CatalogItem>,
}

impl InFlight {
    /// Whether `item` is newer than everything already scheduled for its id
    fn outranked_by(&self, item: &CatalogItem) -> bool {
        item.modified_at() > self.sending
            && self
                .queued
                .as_ref()
                .map_or(true, |queued| item.modified_at() > queued.modified_at())
    }
}

/// Orchestrates pulls, pushes and deletes against one remote gateway
pub struct SyncEngine {
    gateway: Arc<dyn IRemoteGateway>,
    assets: AssetPipeline,
    metadata: Arc<SyncMetadataStore>,
    status: Arc<SyncStatusPublisher>,
    /// Ids with a push in flight
    in_flight: DashMap<ItemId, InFlight>,
    /// Newest `modified_at` that reached the remote table, per id
    pushed: DashMap<ItemId, DateTime<Utc>>,
    cancel: CancellationToken,
}

impl SyncEngine {
    pub fn new(
        gateway: Arc<dyn IRemoteGateway>,
        assets: AssetPipeline,
        metadata: Arc<SyncMetadataStore>,
    ) -> Self {
        Self {
            gateway,
            assets,
            metadata,
            status: Arc::new(SyncStatusPublisher::new()),
            in_flight: DashMap::new(),
            pushed: DashMap::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn status(&self) -> &Arc<SyncStatusPublisher> {
        &self.status
    }

    pub fn metadata(&self) -> &Arc<SyncMetadataStore> {
        &self.metadata
    }

    /// Token cancelled by [`shutdown`](Self::shutdown)
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Number of ids with a push currently in flight
    pub fn pushes_in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Cancels every outstanding and future network call
    pub fn shutdown(&self) {
        info!("Sync engine shutting down");
        self.cancel.cancel();
    }

    // ------------------------------------------------------------------
    // Pull
    // ------------------------------------------------------------------

    /// Fetches the remote table and merges it into `store`
    ///
    /// A cancelled pull leaves the store untouched and publishes `Idle`;
    /// any other failure publishes `Error`.
    #[tracing::instrument(skip(self, store))]
    pub async fn pull(&self, store: &SharedStore) -> Result<PullReport, SyncError> {
        let guard = self.status.begin();
        let started = Instant::now();

        match self.pull_inner(store).await {
            Ok(mut report) => {
                report.duration_ms = started.elapsed().as_millis() as u64;
                info!(
                    fetched = report.fetched,
                    skipped = report.skipped,
                    adopted = report.merge.adopted_remote,
                    added = report.merge.added_remote,
                    applied = report.applied,
                    duration_ms = report.duration_ms,
                    "Pull complete"
                );
                guard.succeed();
                Ok(report)
            }
            Err(SyncError::Cancelled) => {
                info!("Pull cancelled; local catalog untouched");
                guard.cancel();
                Err(SyncError::Cancelled)
            }
            Err(e) => {
                guard.fail(e.to_string());
                Err(e)
            }
        }
    }

    async fn pull_inner(&self, store: &SharedStore) -> Result<PullReport, SyncError> {
        self.ensure_namespace_once().await?;

        let records = self.cancellable(self.gateway.fetch_all()).await?;
        let fetched = records.len();
        let (remote, skipped) = decode_all(records);

        if self.cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        let merge = {
            let mut store = store.lock().await;
            let local = store.items();
            let outcome = ConflictResolver::merge(&local, &remote);
            if outcome.stats.changed() {
                store.replace(outcome.items);
            }
            outcome.stats
        };

        if let Err(e) = self.metadata.record_pull(Utc::now()).await {
            warn!(error = %e, "Failed to record pull time");
        }

        Ok(PullReport {
            fetched,
            skipped,
            merge,
            applied: merge.changed(),
            duration_ms: 0,
        })
    }

    /// Creates the remote namespace on first use
    ///
    /// A failed bootstrap is logged and remembered as done; a missing
    /// namespace then surfaces through the fetch that follows.
    async fn ensure_namespace_once(&self) -> Result<(), SyncError> {
        if self.metadata.get().await.namespace_ready {
            return Ok(());
        }

        match self.cancellable(self.gateway.ensure_namespace()).await {
            Ok(()) => info!("Remote namespace bootstrapped"),
            Err(SyncError::Cancelled) => return Err(SyncError::Cancelled),
            Err(e) => warn!(error = %e, "Namespace bootstrap failed; treating as done"),
        }

        if let Err(e) = self.metadata.mark_namespace_ready().await {
            warn!(error = %e, "Failed to persist namespace bootstrap flag");
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Push
    // ------------------------------------------------------------------

    /// Pushes one item, coalescing with an in-flight push of the same id
    ///
    /// Copies are ordered by `modified_at`: a copy that is not newer than
    /// the one in flight, the one queued or the last one pushed is dropped,
    /// so the remote table never moves back to an older save.
    #[tracing::instrument(skip(self, item), fields(item_id = %item.id()))]
    pub async fn push_single(&self, item: CatalogItem) -> Result<PushOutcome, SyncError> {
        let id = item.id();
        if self.already_pushed(&item) {
            debug!("A newer copy was already pushed; dropping this one");
            return Ok(PushOutcome::Superseded);
        }

        match self.in_flight.entry(id) {
            Entry::Occupied(mut slot) => {
                let state = slot.get_mut();
                if !state.outranked_by(&item) {
                    debug!("A newer copy is already scheduled; dropping this one");
                    return Ok(PushOutcome::Superseded);
                }
                debug!("Push already in flight; queueing latest copy");
                state.queued = Some(item);
                return Ok(PushOutcome::Coalesced);
            }
            Entry::Vacant(slot) => {
                slot.insert(InFlight {
                    sending: item.modified_at(),
                    queued: None,
                });
            }
        }

        let guard = self.status.begin();
        let mut current = item;
        let result = loop {
            let attempt = self.push_record(&current).await;
            if attempt.as_ref().is_err_and(SyncError::is_cancelled) {
                self.in_flight.remove(&id);
                break attempt;
            }
            if attempt.is_ok() {
                self.note_pushed(&current);
            }
            match self.take_queued(id, current.modified_at()) {
                Some(next) => {
                    debug!("Pushing coalesced copy");
                    current = next;
                }
                None => break attempt,
            }
        };

        match result {
            Ok(()) => {
                guard.succeed();
                Ok(PushOutcome::Pushed)
            }
            Err(SyncError::Cancelled) => {
                guard.cancel();
                Err(SyncError::Cancelled)
            }
            Err(e) => {
                guard.fail(e.to_string());
                Err(e)
            }
        }
    }

    /// Takes the copy queued for `id` when it is newer than `sent`, or
    /// releases the id
    fn take_queued(&self, id: ItemId, sent: DateTime<Utc>) -> Option<CatalogItem> {
        match self.in_flight.entry(id) {
            Entry::Occupied(mut slot) => {
                let queued = slot.get_mut().queued.take();
                match queued {
                    Some(next) if next.modified_at() > sent => {
                        slot.get_mut().sending = next.modified_at();
                        Some(next)
                    }
                    _ => {
                        slot.remove();
                        None
                    }
                }
            }
            Entry::Vacant(_) => None,
        }
    }

    fn already_pushed(&self, item: &CatalogItem) -> bool {
        self.pushed
            .get(&item.id())
            .is_some_and(|newest| item.modified_at() < *newest)
    }

    fn note_pushed(&self, item: &CatalogItem) {
        self.pushed
            .entry(item.id())
            .and_modify(|newest| *newest = (*newest).max(item.modified_at()))
            .or_insert(item.modified_at());
    }

    async fn push_record(&self, item: &CatalogItem) -> Result<(), SyncError> {
        let record = self.prepare_record(item).await?;
        self.cancellable(self.gateway.upsert(&record)).await?;
        debug!(item_id = %item.id(), "Record pushed");

        if let Err(e) = self.metadata.record_push(Utc::now()).await {
            warn!(error = %e, "Failed to record push time");
        }
        Ok(())
    }

    /// Encodes an item, uploading its cover image first when it has one
    async fn prepare_record(&self, item: &CatalogItem) -> Result<RemoteRecord, SyncError> {
        let asset = match item.image.as_ref().filter(|bytes| !bytes.is_empty()) {
            Some(bytes) => self.upload_image(item.id(), bytes.clone()).await?,
            None => None,
        };
        Ok(RecordCodec::encode_with_asset(item, asset))
    }

    /// Prepares and uploads a cover image
    ///
    /// Any failure short of cancellation drops the attachment; the record
    /// itself is still pushed.
    async fn upload_image(&self, id: ItemId, raw: Vec<u8>) -> Result<Option<AssetRef>, SyncError> {
        let Some(prepared) = self.assets.prepare_for_transport(raw).await else {
            warn!(item_id = %id, "Cover image could not be prepared; pushing without it");
            return Ok(None);
        };

        let upload = self
            .cancellable(self.gateway.put_asset(prepared.asset(), prepared.path()))
            .await;
        match upload {
            Ok(()) => {
                debug!(
                    item_id = %id,
                    asset = %prepared.asset(),
                    bytes = prepared.byte_len(),
                    "Cover image uploaded"
                );
                Ok(Some(prepared.asset().clone()))
            }
            Err(SyncError::Cancelled) => Err(SyncError::Cancelled),
            Err(e) => {
                warn!(item_id = %id, error = %e, "Cover upload failed; pushing without it");
                Ok(None)
            }
        }
    }

    /// Pushes many items through chunked batch saves
    ///
    /// A failing chunk does not stop the others; any failure publishes
    /// `Error` and is listed in the returned report.
    #[tracing::instrument(skip(self, items), fields(items = items.len()))]
    pub async fn push_all(&self, items: &[CatalogItem]) -> Result<BatchReport, SyncError> {
        let guard = self.status.begin();

        let mut records = Vec::with_capacity(items.len());
        for item in items {
            match self.prepare_record(item).await {
                Ok(record) => records.push(record),
                Err(e) => {
                    guard.cancel();
                    return Err(e);
                }
            }
        }

        let report = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                guard.cancel();
                return Err(SyncError::Cancelled);
            }
            report = self.gateway.batch_upsert(&records) => report,
        };

        info!(
            batches = report.batches_attempted,
            failed = report.batches_failed,
            saved = report.records_saved,
            "Bulk push complete"
        );

        if report.is_complete_success() {
            if let Err(e) = self.metadata.record_push(Utc::now()).await {
                warn!(error = %e, "Failed to record push time");
            }
            guard.succeed();
        } else {
            guard.fail(format!(
                "{} of {} batches failed",
                report.batches_failed, report.batches_attempted
            ));
        }
        Ok(report)
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Deletes the remote copy of an item; a missing record is success
    #[tracing::instrument(skip(self), fields(item_id = %id))]
    pub async fn delete(&self, id: ItemId) -> Result<(), SyncError> {
        let guard = self.status.begin();
        match self.cancellable(self.gateway.delete(&id)).await {
            Ok(()) => {
                self.pushed.remove(&id);
                debug!("Remote record deleted");
                guard.succeed();
                Ok(())
            }
            Err(SyncError::Cancelled) => {
                guard.cancel();
                Err(SyncError::Cancelled)
            }
            Err(e) => {
                guard.fail(e.to_string());
                Err(e)
            }
        }
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    async fn cancellable<T, F>(&self, call: F) -> Result<T, SyncError>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(SyncError::Cancelled),
            result = call => result.map_err(SyncError::Remote),
        }
    }
}

/// Decodes fetched records, returning the items and the number skipped
fn decode_all(records: HashMap<String, RemoteRecord>) -> (Vec<CatalogItem>, usize) {
    let mut items = Vec::with_capacity(records.len());
    let mut skipped = 0;

    for (name, record) in records {
        match RecordCodec::decode(&record) {
            Ok(item) => items.push(item),
            Err(e) => {
                skipped += 1;
                warn!(record = %name, error = %e, "Skipping undecodable record");
            }
        }
    }

    (items, skipped)
}
