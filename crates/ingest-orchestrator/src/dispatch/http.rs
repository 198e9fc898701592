//! HTTP client for the external processing worker

use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

use super::{DispatchClient, DispatchRequest};
use crate::config::WorkerConfig;
use crate::error::{Error, Result};

/// Worker client over HTTP
///
/// - `POST   {base_url}/api/v1/ingestion`
/// - `DELETE {base_url}/api/v1/ingestion/{document_id}`
pub struct HttpDispatchClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpDispatchClient {
    /// Create a client with the configured request timeout
    pub fn new(config: &WorkerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout(),
        })
    }

    fn ingestion_url(&self) -> String {
        format!("{}/api/v1/ingestion", self.base_url)
    }

    fn send_error(&self, url: &str, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout(self.timeout)
        } else {
            Error::dispatch(format!("request to {} failed: {}", url, err))
        }
    }

    async fn check(response: reqwest::Response, what: &str) -> Result<()> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(Error::dispatch(format!(
            "worker rejected {} ({}): {}",
            what, status, body
        )))
    }
}

#[async_trait]
impl DispatchClient for HttpDispatchClient {
    async fn dispatch(&self, request: &DispatchRequest) -> Result<()> {
        let url = self.ingestion_url();

        tracing::info!(
            "Sending document {} to worker at {}",
            request.external_id,
            url
        );

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| self.send_error(&url, e))?;

        Self::check(response, "ingestion request").await
    }

    async fn cancel_remote(&self, document_id: Uuid) -> Result<()> {
        let url = format!("{}/{}", self.ingestion_url(), document_id);

        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(|e| self.send_error(&url, e))?;

        Self::check(response, "cancellation").await
    }

    fn name(&self) -> &str {
        "http"
    }
}
