//! Asset uploads

use wiremock::matchers::{body_bytes, header, method, path};
use wiremock::{Mock, ResponseTemplate};

use longbox_core::domain::AssetRef;
use longbox_core::ports::IRemoteGateway;

use crate::common;

const DIGEST: &str = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08";

#[tokio::test]
async fn test_put_asset_uploads_file_under_digest() {
    let (server, gateway) = common::setup_gateway().await;
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("cover.jpg");
    tokio::fs::write(&file, b"jpeg-bytes").await.unwrap();
    let asset = AssetRef::from_sha256_hex(DIGEST).unwrap();

    Mock::given(method("PUT"))
        .and(path(format!("/zones/{}/assets/{DIGEST}", common::ZONE)))
        .and(header("content-type", "image/jpeg"))
        .and(body_bytes(b"jpeg-bytes".to_vec()))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    gateway
        .put_asset(&asset, &file)
        .await
        .expect("asset upload failed");
}

#[tokio::test]
async fn test_put_asset_missing_file_fails_without_request() {
    let (server, gateway) = common::setup_gateway().await;
    let asset = AssetRef::from_sha256_hex(DIGEST).unwrap();

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let missing = std::path::Path::new("/nonexistent/longbox/cover.jpg");
    assert!(gateway.put_asset(&asset, missing).await.is_err());
}
