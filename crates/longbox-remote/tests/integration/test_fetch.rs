//! Paginated fetch against the mock record service

use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, ResponseTemplate};

use longbox_core::ports::IRemoteGateway;

use crate::common;

#[tokio::test]
async fn test_fetch_all_follows_cursor_until_exhausted() {
    let (server, gateway) = common::setup_gateway().await;
    let first = common::titled_record("Amazing Fantasy");
    let second = common::titled_record("Tales of Suspense");
    let third = common::titled_record("Journey into Mystery");

    Mock::given(method("GET"))
        .and(path(common::records_path()))
        .and(query_param("limit", "2"))
        .and(query_param_is_missing("cursor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "records": [common::record_json(&first), common::record_json(&second)],
            "cursor": "page-2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(common::records_path()))
        .and(query_param("cursor", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "records": [common::record_json(&third)],
            "cursor": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let all = gateway.fetch_all().await.expect("fetch_all failed");

    assert_eq!(all.len(), 3);
    assert_eq!(all[&first.record_name], first);
    assert_eq!(all[&third.record_name], third);
}

#[tokio::test]
async fn test_fetch_page_skips_undecodable_records() {
    let (server, gateway) = common::setup_gateway().await;
    let good = common::titled_record("Showcase");

    Mock::given(method("GET"))
        .and(path(common::records_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "records": [common::record_json(&good), {"recordType": "CatalogItem"}],
            "cursor": ""
        })))
        .mount(&server)
        .await;

    let page = gateway.fetch_page(None).await.expect("fetch_page failed");

    assert_eq!(page.records, vec![good]);
    assert!(page.cursor.is_none());
}

#[tokio::test]
async fn test_fetch_page_retries_service_unavailable() {
    let (server, gateway) = common::setup_gateway().await;

    Mock::given(method("GET"))
        .and(path(common::records_path()))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(common::records_path()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"records": []})),
        )
        .mount(&server)
        .await;

    let page = gateway.fetch_page(None).await.expect("retry should recover");
    assert!(page.records.is_empty());
}

#[tokio::test]
async fn test_fetch_page_does_not_retry_unauthorized() {
    let (server, gateway) = common::setup_gateway().await;

    Mock::given(method("GET"))
        .and(path(common::records_path()))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
        .expect(1)
        .mount(&server)
        .await;

    let err = gateway.fetch_page(None).await.unwrap_err();
    assert!(err.to_string().contains("401"));
}

#[tokio::test]
async fn test_fetch_all_fails_on_middle_page_error() {
    let (server, gateway) = common::setup_gateway().await;

    Mock::given(method("GET"))
        .and(path(common::records_path()))
        .and(query_param_is_missing("cursor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "records": [common::record_json(&common::titled_record("X-Men"))],
            "cursor": "next"
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(common::records_path()))
        .and(query_param("cursor", "next"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;

    assert!(gateway.fetch_all().await.is_err());
}
