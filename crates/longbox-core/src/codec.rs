//! Record codec
//!
//! Total mapping between [`CatalogItem`] and the flat [`RemoteRecord`] wire
//! format. Every item field is written on encode (optionals as
//! [`FieldValue::Absent`]), so saving a record clears fields that were
//! removed locally. The cover image never travels inline: callers attach an
//! [`AssetRef`] with [`RecordCodec::encode_with_asset`].

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{AssetRef, CatalogItem, ItemId, ValuePoint};
use crate::ports::remote_gateway::{FieldValue, RemoteRecord, RECORD_TYPE};

/// Wire field names
pub mod fields {
    pub const TITLE: &str = "title";
    pub const ISSUE_NUMBER: &str = "issueNumber";
    pub const PUBLISHER: &str = "publisher";
    pub const VARIANT: &str = "variant";
    pub const YEAR: &str = "year";
    pub const PURCHASE_PRICE: &str = "purchasePrice";
    pub const CURRENT_VALUE: &str = "currentValue";
    pub const GRADE: &str = "grade";
    pub const NOTES: &str = "notes";
    pub const TAGS: &str = "tags";
    pub const VALUE_HISTORY: &str = "valueHistory";
    pub const STORAGE_LOCATION: &str = "storageLocation";
    pub const CREATED_AT: &str = "createdAt";
    pub const MODIFIED_AT: &str = "modifiedAt";
}

/// Reasons a remote record cannot be decoded
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CodecError {
    #[error("Unexpected record type '{0}'")]
    WrongRecordType(String),

    #[error("Invalid record name: {0}")]
    InvalidRecordName(String),

    #[error("Missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Field '{field}' has wrong type, expected {expected}")]
    TypeMismatch {
        field: &'static str,
        expected: &'static str,
    },

    #[error("Invalid value history entry: {0}")]
    InvalidHistory(String),
}

/// Stateless encoder/decoder for catalog records
pub struct RecordCodec;

impl RecordCodec {
    /// Encodes an item without an attachment
    pub fn encode(item: &CatalogItem) -> RemoteRecord {
        Self::encode_with_asset(item, None)
    }

    /// Encodes an item, attaching an already uploaded cover asset
    pub fn encode_with_asset(item: &CatalogItem, asset: Option<AssetRef>) -> RemoteRecord {
        let mut record = RemoteRecord::new(item.id());
        let f = &mut record.fields;

        f.insert(fields::TITLE.into(), FieldValue::String(item.title.clone()));
        f.insert(
            fields::ISSUE_NUMBER.into(),
            FieldValue::opt_string(item.issue_number.as_deref()),
        );
        f.insert(
            fields::PUBLISHER.into(),
            FieldValue::opt_string(item.publisher.as_deref()),
        );
        f.insert(
            fields::VARIANT.into(),
            FieldValue::opt_string(item.variant.as_deref()),
        );
        f.insert(
            fields::YEAR.into(),
            FieldValue::opt_number(item.year.map(f64::from)),
        );
        f.insert(
            fields::PURCHASE_PRICE.into(),
            FieldValue::opt_number(item.purchase_price),
        );
        f.insert(
            fields::CURRENT_VALUE.into(),
            FieldValue::opt_number(item.current_value),
        );
        f.insert(fields::GRADE.into(), FieldValue::opt_number(item.grade));
        f.insert(fields::NOTES.into(), FieldValue::String(item.notes.clone()));
        f.insert(fields::TAGS.into(), FieldValue::StringList(item.tags.clone()));
        f.insert(
            fields::VALUE_HISTORY.into(),
            FieldValue::StringList(
                item.value_history()
                    .iter()
                    .filter(|p| p.value.is_finite())
                    .filter_map(|p| serde_json::to_string(p).ok())
                    .collect(),
            ),
        );
        f.insert(
            fields::STORAGE_LOCATION.into(),
            FieldValue::opt_string(item.storage_location.as_deref()),
        );
        f.insert(fields::CREATED_AT.into(), FieldValue::Date(item.created_at()));
        f.insert(fields::MODIFIED_AT.into(), FieldValue::Date(item.modified_at()));

        record.asset = asset;
        record
    }

    /// Decodes a remote record into an item
    ///
    /// The decoded item never carries image bytes; a referenced asset stays
    /// on the record.
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] when the record type, name, or a required
    /// field is unusable. Optional fields that are missing decode as `None`.
    pub fn decode(record: &RemoteRecord) -> Result<CatalogItem, CodecError> {
        if record.record_type != RECORD_TYPE {
            return Err(CodecError::WrongRecordType(record.record_type.clone()));
        }

        let id: ItemId = record
            .record_name
            .parse()
            .map_err(|_| CodecError::InvalidRecordName(record.record_name.clone()))?;

        let title = required_string(record, fields::TITLE)?;
        let created_at = required_date(record, fields::CREATED_AT)?;
        let modified_at = required_date(record, fields::MODIFIED_AT)?;

        let mut item = CatalogItem::from_parts(id, title, created_at, modified_at);
        item.issue_number = optional_string(record, fields::ISSUE_NUMBER)?;
        item.publisher = optional_string(record, fields::PUBLISHER)?;
        item.variant = optional_string(record, fields::VARIANT)?;
        item.year = optional_number(record, fields::YEAR)?.map(|y| y.round() as i32);
        item.purchase_price = optional_number(record, fields::PURCHASE_PRICE)?;
        item.current_value = optional_number(record, fields::CURRENT_VALUE)?;
        item.grade = optional_number(record, fields::GRADE)?;
        item.notes = optional_string(record, fields::NOTES)?.unwrap_or_default();
        item.tags = optional_list(record, fields::TAGS)?;
        item.storage_location = optional_string(record, fields::STORAGE_LOCATION)?;

        let history = optional_list(record, fields::VALUE_HISTORY)?
            .iter()
            .map(|entry| {
                serde_json::from_str::<ValuePoint>(entry)
                    .map_err(|e| CodecError::InvalidHistory(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        item.set_value_history(history);

        Ok(item)
    }
}

fn required_string(record: &RemoteRecord, field: &'static str) -> Result<String, CodecError> {
    optional_string(record, field)?.ok_or(CodecError::MissingField(field))
}

fn required_date(record: &RemoteRecord, field: &'static str) -> Result<DateTime<Utc>, CodecError> {
    match record.field(field) {
        Some(FieldValue::Date(d)) => Ok(*d),
        None | Some(FieldValue::Absent) => Err(CodecError::MissingField(field)),
        Some(_) => Err(CodecError::TypeMismatch {
            field,
            expected: "date",
        }),
    }
}

fn optional_string(record: &RemoteRecord, field: &'static str) -> Result<Option<String>, CodecError> {
    match record.field(field) {
        Some(FieldValue::String(s)) => Ok(Some(s.clone())),
        None | Some(FieldValue::Absent) => Ok(None),
        Some(_) => Err(CodecError::TypeMismatch {
            field,
            expected: "string",
        }),
    }
}

fn optional_number(record: &RemoteRecord, field: &'static str) -> Result<Option<f64>, CodecError> {
    match record.field(field) {
        Some(FieldValue::Number(n)) => Ok(Some(*n)),
        None | Some(FieldValue::Absent) => Ok(None),
        Some(_) => Err(CodecError::TypeMismatch {
            field,
            expected: "number",
        }),
    }
}

fn optional_list(record: &RemoteRecord, field: &'static str) -> Result<Vec<String>, CodecError> {
    match record.field(field) {
        Some(FieldValue::StringList(items)) => Ok(items.clone()),
        None | Some(FieldValue::Absent) => Ok(Vec::new()),
        Some(_) => Err(CodecError::TypeMismatch {
            field,
            expected: "string list",
        }),
    }
}
