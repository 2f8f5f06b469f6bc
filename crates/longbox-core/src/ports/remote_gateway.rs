//! Remote gateway port (driven/secondary port)
//!
//! This module defines the interface to the remote record table that mirrors
//! the local catalog, together with the flat wire DTOs that cross it.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are adapter-specific.
//! - `fetch_all` and `batch_upsert` are provided in terms of the primitive
//!   page and batch calls, so every adapter gets the same pagination and
//!   batch-isolation behavior.
//! - `RemoteRecord` is a port-level DTO; `RecordCodec` maps it to and from
//!   `CatalogItem`.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::newtypes::{AssetRef, Cursor, ItemId};

/// Record type tag carried by every catalog record
pub const RECORD_TYPE: &str = "CatalogItem";

/// Chunk size used by [`IRemoteGateway::batch_upsert`] unless overridden
pub const DEFAULT_BATCH_SIZE: usize = 100;

// ============================================================================
// Wire DTOs
// ============================================================================

/// A single typed field value on the wire
///
/// The union is exhaustive: every `CatalogItem` field maps to exactly one
/// variant, and `Absent` is sent for `None` so a save clears the remote
/// field instead of leaving a stale value behind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Absent,
    String(String),
    Number(f64),
    Date(DateTime<Utc>),
    StringList(Vec<String>),
}

impl FieldValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, FieldValue::Absent)
    }

    /// Wraps an optional string, mapping `None` to `Absent`
    pub fn opt_string(value: Option<&str>) -> Self {
        value.map_or(FieldValue::Absent, |s| FieldValue::String(s.to_string()))
    }

    /// Wraps an optional number, mapping `None` to `Absent`
    ///
    /// NaN and infinities have no JSON representation, so they are sent as
    /// `Absent` too.
    pub fn opt_number(value: Option<f64>) -> Self {
        value
            .filter(|n| n.is_finite())
            .map_or(FieldValue::Absent, FieldValue::Number)
    }
}

/// Flat remote representation of one catalog item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRecord {
    /// Canonical item id string; the remote primary key
    pub record_name: String,
    pub record_type: String,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
    /// Cover image, uploaded separately under its content hash
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset: Option<AssetRef>,
}

impl RemoteRecord {
    /// Creates an empty catalog record for the given id
    pub fn new(id: ItemId) -> Self {
        Self {
            record_name: id.to_string(),
            record_type: RECORD_TYPE.to_string(),
            fields: BTreeMap::new(),
            asset: None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}

/// One page of a paginated fetch
#[derive(Debug, Clone, Default)]
pub struct RecordPage {
    pub records: Vec<RemoteRecord>,
    /// Continuation for the next page; `None` on the last page
    pub cursor: Option<Cursor>,
}

/// Outcome of a chunked batch write
///
/// A failing chunk never aborts the remaining ones; each failure is
/// recorded here instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub batches_attempted: usize,
    pub batches_failed: usize,
    pub records_saved: usize,
    pub records_failed: usize,
    pub errors: Vec<String>,
}

impl BatchReport {
    pub fn is_complete_success(&self) -> bool {
        self.batches_failed == 0
    }

    pub fn is_partial_failure(&self) -> bool {
        self.batches_failed > 0 && self.records_saved > 0
    }

    /// Folds another report into this one
    pub fn absorb(&mut self, other: BatchReport) {
        self.batches_attempted += other.batches_attempted;
        self.batches_failed += other.batches_failed;
        self.records_saved += other.records_saved;
        self.records_failed += other.records_failed;
        self.errors.extend(other.errors);
    }
}

// ============================================================================
// IRemoteGateway trait
// ============================================================================

/// Port trait for the remote record table
///
/// ## Implementation Notes
///
/// - `ensure_namespace`, `upsert` and `delete` must be idempotent: an
///   already-existing namespace or a missing record is success.
/// - Adapters may retry transient failures of `fetch_page` internally;
///   writes are expected to surface their first failure.
#[async_trait::async_trait]
pub trait IRemoteGateway: Send + Sync {
    /// Creates the remote namespace (zone) if it does not already exist
    async fn ensure_namespace(&self) -> anyhow::Result<()>;

    /// Fetches one page of records
    ///
    /// `None` requests the first page; afterwards pass the cursor returned
    /// by the previous page.
    async fn fetch_page(&self, cursor: Option<&Cursor>) -> anyhow::Result<RecordPage>;

    /// Saves a record, creating it if missing and overlaying its fields otherwise
    async fn upsert(&self, record: &RemoteRecord) -> anyhow::Result<()>;

    /// Deletes a record; a missing record is not an error
    async fn delete(&self, id: &ItemId) -> anyhow::Result<()>;

    /// Saves a group of records in one remote call
    async fn save_batch(&self, records: &[RemoteRecord]) -> anyhow::Result<()>;

    /// Uploads the file at `path` under its content address
    async fn put_asset(&self, asset: &AssetRef, path: &Path) -> anyhow::Result<()>;

    /// Number of records per `save_batch` call used by `batch_upsert`
    fn batch_size(&self) -> usize {
        DEFAULT_BATCH_SIZE
    }

    /// Fetches the whole table, following cursors until exhausted
    ///
    /// The result is keyed by `record_name`; a record seen on several pages
    /// keeps its last occurrence. Any page failure fails the whole fetch so
    /// callers never merge a partial view.
    async fn fetch_all(&self) -> anyhow::Result<HashMap<String, RemoteRecord>> {
        let mut records = HashMap::new();
        let mut cursor: Option<Cursor> = None;
        let mut seen_cursors: HashSet<Cursor> = HashSet::new();
        let mut page_count: u32 = 0;

        loop {
            let page = self.fetch_page(cursor.as_ref()).await?;
            page_count += 1;

            debug!(
                page = page_count,
                records = page.records.len(),
                has_next = page.cursor.is_some(),
                "Received record page"
            );

            for record in page.records {
                records.insert(record.record_name.clone(), record);
            }

            match page.cursor {
                Some(next) if !seen_cursors.insert(next.clone()) => {
                    anyhow::bail!("Remote returned cursor {next} twice; pagination loops");
                }
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        debug!(
            total_records = records.len(),
            total_pages = page_count,
            "Full fetch complete"
        );

        Ok(records)
    }

    /// Saves records in sequential chunks of `batch_size()`
    ///
    /// A failing chunk is logged and recorded in the report; the remaining
    /// chunks still run.
    async fn batch_upsert(&self, records: &[RemoteRecord]) -> BatchReport {
        let mut report = BatchReport::default();
        let chunk_size = self.batch_size().max(1);

        for (index, chunk) in records.chunks(chunk_size).enumerate() {
            report.batches_attempted += 1;
            match self.save_batch(chunk).await {
                Ok(()) => {
                    report.records_saved += chunk.len();
                    debug!(batch = index + 1, records = chunk.len(), "Batch saved");
                }
                Err(e) => {
                    report.batches_failed += 1;
                    report.records_failed += chunk.len();
                    warn!(
                        batch = index + 1,
                        records = chunk.len(),
                        error = %e,
                        "Batch save failed; continuing with remaining batches"
                    );
                    report.errors.push(format!("batch {}: {:#}", index + 1, e));
                }
            }
        }

        report
    }
}
