//! Namespace creation, record saves, deletes and batch saves

use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

use longbox_core::codec::fields;
use longbox_core::domain::ItemId;
use longbox_core::ports::{FieldValue, IRemoteGateway};
use longbox_remote::{HttpRecordGateway, RecordClient};

use crate::common;

#[tokio::test]
async fn test_ensure_namespace_accepts_existing_zone() {
    let (server, gateway) = common::setup_gateway().await;

    Mock::given(method("PUT"))
        .and(path(format!("/zones/{}", common::ZONE)))
        .respond_with(ResponseTemplate::new(409))
        .expect(1)
        .mount(&server)
        .await;

    gateway
        .ensure_namespace()
        .await
        .expect("existing zone is success");
}

#[tokio::test]
async fn test_requests_carry_bearer_token() {
    let server = wiremock::MockServer::start().await;
    let gateway = HttpRecordGateway::new(
        RecordClient::with_base_url(server.uri(), common::ZONE).with_token("secret-token"),
    );

    Mock::given(method("PUT"))
        .and(path(format!("/zones/{}", common::ZONE)))
        .and(header("authorization", "Bearer secret-token"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    gateway.ensure_namespace().await.unwrap();
}

#[tokio::test]
async fn test_upsert_creates_missing_record() {
    let (server, gateway) = common::setup_gateway().await;
    let record = common::titled_record("Detective Comics");

    Mock::given(method("GET"))
        .and(path(common::record_path(&record.record_name)))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path(common::record_path(&record.record_name)))
        .and(body_partial_json(serde_json::json!({
            "recordName": record.record_name,
            "fields": {"title": {"type": "string", "value": "Detective Comics"}}
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    gateway.upsert(&record).await.expect("upsert failed");
}

#[tokio::test]
async fn test_upsert_overlays_existing_fields() {
    let (server, gateway) = common::setup_gateway().await;
    let record = common::titled_record("Updated Title");

    let mut stored = record.clone();
    stored
        .fields
        .insert(fields::TITLE.into(), FieldValue::String("Old Title".into()));
    stored
        .fields
        .insert("shelfColor".into(), FieldValue::String("blue".into()));

    Mock::given(method("GET"))
        .and(path(common::record_path(&record.record_name)))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::record_json(&stored)))
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path(common::record_path(&record.record_name)))
        .and(body_partial_json(serde_json::json!({
            "fields": {
                "title": {"type": "string", "value": "Updated Title"},
                "shelfColor": {"type": "string", "value": "blue"}
            }
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    gateway.upsert(&record).await.expect("upsert failed");
}

#[tokio::test]
async fn test_upsert_surfaces_server_error() {
    let (server, gateway) = common::setup_gateway().await;
    let record = common::titled_record("Rejected");

    Mock::given(method("GET"))
        .and(path(common::record_path(&record.record_name)))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path(common::record_path(&record.record_name)))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let err = gateway.upsert(&record).await.unwrap_err();
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn test_delete_missing_record_is_success() {
    let (server, gateway) = common::setup_gateway().await;
    let id = ItemId::new();

    Mock::given(method("DELETE"))
        .and(path(common::record_path(&id.to_string())))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    gateway.delete(&id).await.expect("404 on delete is success");
}

#[tokio::test]
async fn test_batch_upsert_isolates_rejected_chunk() {
    let (server, gateway) = common::setup_gateway().await;
    let gateway = gateway.with_batch_size(2);
    let records: Vec<_> = (0..5)
        .map(|i| common::titled_record(&format!("Issue {i}")))
        .collect();

    let batch_path = format!("{}/batch", common::records_path());

    // The second chunk starts with records[2]
    Mock::given(method("POST"))
        .and(path(batch_path.clone()))
        .and(body_partial_json(serde_json::json!({
            "records": [{"recordName": records[2].record_name}]
        })))
        .respond_with(ResponseTemplate::new(400))
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(batch_path))
        .respond_with(ResponseTemplate::new(200))
        .with_priority(2)
        .mount(&server)
        .await;

    let report = gateway.batch_upsert(&records).await;

    assert_eq!(report.batches_attempted, 3);
    assert_eq!(report.batches_failed, 1);
    assert_eq!(report.records_saved, 3);
    assert_eq!(report.records_failed, 2);
    assert_eq!(report.errors.len(), 1);
}
