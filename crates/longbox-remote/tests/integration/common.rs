//! Shared helpers for record service integration tests

use std::time::Duration;

use wiremock::MockServer;

use longbox_core::codec::fields;
use longbox_core::domain::ItemId;
use longbox_core::ports::{FieldValue, RemoteRecord};
use longbox_remote::{HttpRecordGateway, RecordClient, RetryPolicy};

/// Zone used by every test
pub const ZONE: &str = "catalog";

/// Starts a mock server and returns a gateway pointed at it
///
/// Retries use a 1 ms base delay so transient-failure tests stay fast.
pub async fn setup_gateway() -> (MockServer, HttpRecordGateway) {
    let server = MockServer::start().await;
    let gateway = HttpRecordGateway::new(RecordClient::with_base_url(server.uri(), ZONE))
        .with_page_size(2)
        .with_retry_policy(RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(1),
        });
    (server, gateway)
}

pub fn records_path() -> String {
    format!("/zones/{ZONE}/records")
}

pub fn record_path(name: &str) -> String {
    format!("/zones/{ZONE}/records/{name}")
}

/// A record carrying just a title
pub fn titled_record(title: &str) -> RemoteRecord {
    let mut record = RemoteRecord::new(ItemId::new());
    record
        .fields
        .insert(fields::TITLE.into(), FieldValue::String(title.into()));
    record
}

/// JSON form of a record as the server would return it
pub fn record_json(record: &RemoteRecord) -> serde_json::Value {
    serde_json::to_value(record).expect("record serializes")
}
