//! Document types held by the document store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata about a stored document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StoredDocument {
    /// Document ID (also the external ID the worker reports back with)
    pub id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// MIME type of the uploaded file
    pub mime_type: String,
    /// SHA-256 of the content, hex encoded; addresses the blob
    pub content_hash: String,
    /// Size in bytes
    pub size: u64,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a document
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub title: String,
    pub description: Option<String>,
    pub mime_type: String,
    pub content: Vec<u8>,
}

/// Partial update of document metadata; absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentUpdate {
    #[serde(default)]
    pub title: Option<String>,
    /// An empty description clears it
    #[serde(default)]
    pub description: Option<String>,
}
