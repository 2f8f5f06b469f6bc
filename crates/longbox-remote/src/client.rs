//! HTTP client for the remote record service
//!
//! Wraps `reqwest::Client` with bearer authentication and zone-scoped URL
//! construction.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use tracing::debug;

use longbox_core::config::RemoteConfig;

use crate::error::RemoteError;

/// Default per-request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Authenticated client scoped to one zone
#[derive(Debug, Clone)]
pub struct RecordClient {
    client: Client,
    base_url: String,
    zone: String,
    api_token: Option<String>,
}

impl RecordClient {
    /// Builds a client from the `remote` configuration section
    pub fn from_config(config: &RemoteConfig) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RemoteError::Config(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            zone: config.zone.clone(),
            api_token: config.api_token.clone(),
        })
    }

    /// Creates an unauthenticated client (useful for testing)
    pub fn with_base_url(base_url: impl Into<String>, zone: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            zone: zone.into(),
            api_token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn zone(&self) -> &str {
        &self.zone
    }

    /// URL of the zone itself
    pub fn zone_url(&self) -> String {
        format!("{}/zones/{}", self.base_url, self.zone)
    }

    /// URL of a resource inside the zone, e.g. `records/batch`
    pub fn zone_resource(&self, suffix: &str) -> String {
        format!("{}/{}", self.zone_url(), suffix)
    }

    /// Creates an authenticated request builder for an absolute URL
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        debug!(%method, url, "Building remote request");
        let builder = self.client.request(method, url);
        match &self.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Sends a request, mapping transport failures
    pub async fn send(
        &self,
        operation: &str,
        builder: RequestBuilder,
    ) -> Result<Response, RemoteError> {
        builder
            .send()
            .await
            .map_err(|e| RemoteError::network(operation, e))
    }

    /// Returns the response if its status is a success or one of `accepted`
    pub async fn expect_status(
        operation: &str,
        response: Response,
        accepted: &[StatusCode],
    ) -> Result<Response, RemoteError> {
        let status = response.status();
        if status.is_success() || accepted.contains(&status) {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(RemoteError::http(operation, status, truncate(&body)))
    }
}

/// Keeps error bodies readable in logs
fn truncate(body: &str) -> String {
    const LIMIT: usize = 256;
    if body.len() <= LIMIT {
        return body.to_string();
    }
    let mut end = LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &body[..end])
}
