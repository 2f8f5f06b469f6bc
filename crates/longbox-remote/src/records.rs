//! Wire envelopes of the record service
//!
//! Individual records inside a page are kept as raw JSON until decoded one
//! by one, so a single malformed record is skipped instead of failing the
//! whole page.

use serde::{Deserialize, Serialize};
use tracing::warn;

use longbox_core::domain::Cursor;
use longbox_core::ports::{RecordPage, RemoteRecord};

/// Body of `GET .../records`
#[derive(Debug, Deserialize)]
pub struct PageResponse {
    #[serde(default)]
    pub records: Vec<serde_json::Value>,
    #[serde(default)]
    pub cursor: Option<String>,
}

impl PageResponse {
    /// Decodes every record that parses, logging and dropping the rest
    pub fn into_page(self) -> RecordPage {
        let total = self.records.len();
        let records: Vec<RemoteRecord> = self
            .records
            .into_iter()
            .filter_map(|raw| match serde_json::from_value::<RemoteRecord>(raw) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(error = %e, "Skipping undecodable remote record");
                    None
                }
            })
            .collect();

        if records.len() < total {
            warn!(
                skipped = total - records.len(),
                total,
                "Page contained undecodable records"
            );
        }

        RecordPage {
            records,
            cursor: Cursor::from_wire(self.cursor),
        }
    }
}

/// Body of `POST .../records/batch`
#[derive(Debug, Serialize)]
pub struct BatchRequest<'a> {
    pub records: &'a [RemoteRecord],
}
