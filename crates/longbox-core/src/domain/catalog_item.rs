//! CatalogItem domain entity
//!
//! A `CatalogItem` is one collected issue in the local catalog. The local
//! snapshot is authoritative; remote copies are reconciled against it using
//! `modified_at` as the precedence key.
//!
//! ## Mutation rules
//!
//! - `id` and `created_at` never change after construction
//! - `modified_at` only moves through [`CatalogItem::touch`], and never
//!   backwards, even if the wall clock does
//! - `value_history` is append-only: [`CatalogItem::record_value`] appends,
//!   [`CatalogItem::undo_last_value`] removes the tail

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::ItemId;
use super::value_point::ValuePoint;

/// One collected issue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    id: ItemId,
    pub title: String,
    #[serde(default)]
    pub issue_number: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub variant: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    /// Cover image bytes, base64 in the snapshot
    #[serde(default, with = "base64_bytes")]
    pub image: Option<Vec<u8>>,
    #[serde(default)]
    pub purchase_price: Option<f64>,
    #[serde(default)]
    pub current_value: Option<f64>,
    #[serde(default)]
    pub grade: Option<f64>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    value_history: Vec<ValuePoint>,
    /// Key of the box/shelf the issue is stored in
    #[serde(default)]
    pub storage_location: Option<String>,
    created_at: DateTime<Utc>,
    modified_at: DateTime<Utc>,
}

impl CatalogItem {
    /// Creates a new item with a fresh id, stamped now
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self::from_parts(ItemId::new(), title, now, now)
    }

    /// Rebuilds an item with known identity and timestamps
    ///
    /// Used when decoding remote records and in tests that need precise
    /// control over precedence.
    pub fn from_parts(
        id: ItemId,
        title: impl Into<String>,
        created_at: DateTime<Utc>,
        modified_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            issue_number: None,
            publisher: None,
            variant: None,
            year: None,
            image: None,
            purchase_price: None,
            current_value: None,
            grade: None,
            notes: String::new(),
            tags: Vec::new(),
            value_history: Vec::new(),
            storage_location: None,
            created_at,
            modified_at,
        }
    }

    // --- Getters ---

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn modified_at(&self) -> DateTime<Utc> {
        self.modified_at
    }

    pub fn value_history(&self) -> &[ValuePoint] {
        &self.value_history
    }

    pub fn has_image(&self) -> bool {
        self.image.as_ref().is_some_and(|bytes| !bytes.is_empty())
    }

    // --- Mutations ---

    /// Bumps `modified_at` to now
    ///
    /// If the clock has gone backwards since the last stamp, the timestamp
    /// advances by one microsecond instead so a local edit always outranks
    /// the version it replaced.
    pub fn touch(&mut self) {
        let now = Utc::now();
        self.modified_at = if now > self.modified_at {
            now
        } else {
            self.modified_at + Duration::microseconds(1)
        };
    }

    /// Appends a valuation and makes it the current value
    pub fn record_value(&mut self, point: ValuePoint) {
        self.current_value = Some(point.value);
        self.value_history.push(point);
    }

    /// Removes the most recent valuation
    ///
    /// The current value falls back to the new tail, or `None` when the
    /// history becomes empty.
    pub fn undo_last_value(&mut self) -> Option<ValuePoint> {
        let removed = self.value_history.pop()?;
        self.current_value = self.value_history.last().map(|p| p.value);
        Some(removed)
    }

    /// Replaces the whole history; only the record codec rebuilds items this way
    pub(crate) fn set_value_history(&mut self, history: Vec<ValuePoint>) {
        self.value_history = history;
    }

    // --- Builders ---

    pub fn with_issue_number(mut self, issue: impl Into<String>) -> Self {
        self.issue_number = Some(issue.into());
        self
    }

    pub fn with_publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = Some(publisher.into());
        self
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_image(mut self, bytes: Vec<u8>) -> Self {
        self.image = Some(bytes);
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// Serde adapter storing optional binary payloads as base64 strings
mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        encoded
            .map(|s| STANDARD.decode(s.as_bytes()).map_err(serde::de::Error::custom))
            .transpose()
    }
}
