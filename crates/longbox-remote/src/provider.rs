//! HttpRecordGateway - IRemoteGateway implementation over HTTP
//!
//! ## Design Notes
//!
//! - Only `fetch_page` and the read half of `upsert` are retried; they are
//!   idempotent reads. Writes fail fast and the sync engine reports them.
//! - `upsert` overlays the local fields on the stored record, so fields the
//!   server knows about but this client does not are preserved.

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use tracing::{debug, info, instrument};

use longbox_core::config::RemoteConfig;
use longbox_core::domain::{AssetRef, Cursor, ItemId};
use longbox_core::ports::{IRemoteGateway, RecordPage, RemoteRecord, DEFAULT_BATCH_SIZE};

use crate::client::RecordClient;
use crate::error::RemoteError;
use crate::records::{BatchRequest, PageResponse};
use crate::retry::RetryPolicy;

const DEFAULT_PAGE_SIZE: u32 = 200;

/// Remote record table reached over HTTP
#[derive(Debug, Clone)]
pub struct HttpRecordGateway {
    client: RecordClient,
    page_size: u32,
    batch_size: usize,
    retry: RetryPolicy,
}

impl HttpRecordGateway {
    pub fn new(client: RecordClient) -> Self {
        Self {
            client,
            page_size: DEFAULT_PAGE_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            retry: RetryPolicy::default(),
        }
    }

    /// Builds a gateway from the `remote` configuration section
    pub fn from_config(config: &RemoteConfig) -> Result<Self, RemoteError> {
        Ok(Self::new(RecordClient::from_config(config)?)
            .with_page_size(config.page_size)
            .with_batch_size(config.batch_size))
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn client(&self) -> &RecordClient {
        &self.client
    }

    fn record_url(&self, record_name: &str) -> String {
        self.client.zone_resource(&format!("records/{record_name}"))
    }

    /// Fetches one stored record, `None` if it does not exist
    pub async fn get_record(&self, record_name: &str) -> Result<Option<RemoteRecord>, RemoteError> {
        const OP: &str = "get record";
        let url = self.record_url(record_name);

        self.retry
            .run(OP, || async {
                let response = self
                    .client
                    .send(OP, self.client.request(Method::GET, &url))
                    .await?;
                if response.status() == StatusCode::NOT_FOUND {
                    return Ok(None);
                }
                let response = RecordClient::expect_status(OP, response, &[]).await?;
                let record = response
                    .json::<RemoteRecord>()
                    .await
                    .map_err(|e| RemoteError::decode(OP, e.to_string()))?;
                Ok(Some(record))
            })
            .await
    }

    async fn fetch_page_inner(&self, cursor: Option<&Cursor>) -> Result<RecordPage, RemoteError> {
        const OP: &str = "fetch page";
        let url = self.client.zone_resource("records");
        let limit = self.page_size.to_string();

        self.retry
            .run(OP, || async {
                let mut query: Vec<(&str, &str)> = vec![("limit", limit.as_str())];
                if let Some(c) = cursor {
                    query.push(("cursor", c.as_str()));
                }
                let builder = self.client.request(Method::GET, &url).query(&query);
                let response = self.client.send(OP, builder).await?;
                let response = RecordClient::expect_status(OP, response, &[]).await?;
                let body = response
                    .json::<PageResponse>()
                    .await
                    .map_err(|e| RemoteError::decode(OP, e.to_string()))?;
                Ok(body.into_page())
            })
            .await
    }
}

#[async_trait]
impl IRemoteGateway for HttpRecordGateway {
    #[instrument(skip(self), fields(zone = %self.client.zone()))]
    async fn ensure_namespace(&self) -> Result<()> {
        const OP: &str = "ensure namespace";
        let response = self
            .client
            .send(OP, self.client.request(Method::PUT, &self.client.zone_url()))
            .await?;
        let status = response.status();
        RecordClient::expect_status(OP, response, &[StatusCode::CONFLICT]).await?;
        info!(status = status.as_u16(), "Remote namespace ready");
        Ok(())
    }

    async fn fetch_page(&self, cursor: Option<&Cursor>) -> Result<RecordPage> {
        let page = self.fetch_page_inner(cursor).await?;
        debug!(
            records = page.records.len(),
            has_next = page.cursor.is_some(),
            "Fetched record page"
        );
        Ok(page)
    }

    #[instrument(skip(self, record), fields(record = %record.record_name))]
    async fn upsert(&self, record: &RemoteRecord) -> Result<()> {
        const OP: &str = "save record";

        let merged = match self.get_record(&record.record_name).await? {
            Some(mut stored) => {
                stored.record_type = record.record_type.clone();
                stored.fields.extend(record.fields.clone());
                if record.asset.is_some() {
                    stored.asset = record.asset.clone();
                }
                stored
            }
            None => record.clone(),
        };

        let builder = self
            .client
            .request(Method::PUT, &self.record_url(&record.record_name))
            .json(&merged);
        let response = self.client.send(OP, builder).await?;
        RecordClient::expect_status(OP, response, &[]).await?;
        debug!("Record saved");
        Ok(())
    }

    #[instrument(skip(self), fields(record = %id))]
    async fn delete(&self, id: &ItemId) -> Result<()> {
        const OP: &str = "delete record";
        let builder = self
            .client
            .request(Method::DELETE, &self.record_url(&id.to_string()));
        let response = self.client.send(OP, builder).await?;
        let status = response.status();
        RecordClient::expect_status(OP, response, &[StatusCode::NOT_FOUND]).await?;
        debug!(status = status.as_u16(), "Record deleted");
        Ok(())
    }

    async fn save_batch(&self, records: &[RemoteRecord]) -> Result<()> {
        const OP: &str = "save batch";
        let builder = self
            .client
            .request(Method::POST, &self.client.zone_resource("records/batch"))
            .json(&BatchRequest { records });
        let response = self.client.send(OP, builder).await?;
        RecordClient::expect_status(OP, response, &[]).await?;
        Ok(())
    }

    #[instrument(skip(self, path), fields(asset = %asset))]
    async fn put_asset(&self, asset: &AssetRef, path: &Path) -> Result<()> {
        const OP: &str = "upload asset";
        let bytes = tokio::fs::read(path).await.map_err(RemoteError::from)?;
        let size = bytes.len();
        let builder = self
            .client
            .request(
                Method::PUT,
                &self.client.zone_resource(&format!("assets/{}", asset.digest())),
            )
            .header(reqwest::header::CONTENT_TYPE, "image/jpeg")
            .body(bytes);
        let response = self.client.send(OP, builder).await?;
        RecordClient::expect_status(OP, response, &[]).await?;
        debug!(bytes = size, "Asset uploaded");
        Ok(())
    }

    fn batch_size(&self) -> usize {
        self.batch_size
    }
}
