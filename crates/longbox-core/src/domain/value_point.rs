//! Value history entries for catalog items

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// Where a recorded value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueSource {
    /// Entered by the collector
    Manual,
    /// Produced by an external price estimator
    Estimated,
}

impl fmt::Display for ValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueSource::Manual => write!(f, "manual"),
            ValueSource::Estimated => write!(f, "estimated"),
        }
    }
}

impl FromStr for ValueSource {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(ValueSource::Manual),
            "estimated" => Ok(ValueSource::Estimated),
            other => Err(DomainError::InvalidValueSource(other.to_string())),
        }
    }
}

/// A single dated valuation in an item's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuePoint {
    pub date: DateTime<Utc>,
    pub value: f64,
    pub source: ValueSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ValuePoint {
    /// A manual valuation dated now
    pub fn manual(value: f64) -> Self {
        Self {
            date: Utc::now(),
            value,
            source: ValueSource::Manual,
            note: None,
        }
    }

    /// An estimated valuation dated now
    pub fn estimated(value: f64) -> Self {
        Self {
            date: Utc::now(),
            value,
            source: ValueSource::Estimated,
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = date;
        self
    }
}
