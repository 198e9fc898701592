//! Dispatch client: hand-off to the external processing worker
//!
//! Implementations:
//! - `HttpDispatchClient`: the worker's HTTP API

mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

pub use http::HttpDispatchClient;

/// Payload sent to the worker to start ingestion
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DispatchRequest {
    /// Document ID; the worker reports back with it as `externalId`
    pub external_id: Uuid,
    pub title: String,
    pub description: String,
    /// Document text
    pub content: String,
    /// Webhook the worker posts status updates to
    pub callback_url: String,
}

/// Remote calls to the external worker
///
/// Both calls are fire-and-forget from the worker's point of view: success
/// only means the request was accepted.
#[async_trait]
pub trait DispatchClient: Send + Sync {
    /// Ask the worker to ingest a document
    async fn dispatch(&self, request: &DispatchRequest) -> Result<()>;

    /// Ask the worker to stop ingesting a document (best effort)
    async fn cancel_remote(&self, document_id: Uuid) -> Result<()>;

    /// Client name for logging
    fn name(&self) -> &str;
}
