//! Document store: document metadata plus content-addressed blobs
//!
//! Implementations:
//! - `LocalDocumentStore`: local filesystem

mod local;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::types::{DocumentUpdate, NewDocument, StoredDocument};

pub use local::LocalDocumentStore;

/// Trait for document storage
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Store a new document and its content
    async fn create(&self, document: NewDocument) -> Result<StoredDocument>;

    /// Document metadata, or `Error::DocumentNotFound`
    async fn get(&self, id: Uuid) -> Result<StoredDocument>;

    /// Raw document content, or `Error::DocumentNotFound`
    async fn read_content(&self, id: Uuid) -> Result<Vec<u8>>;

    /// Apply a metadata update, or `Error::DocumentNotFound`
    async fn update(&self, id: Uuid, update: DocumentUpdate) -> Result<StoredDocument>;

    /// All documents, newest first
    async fn list(&self) -> Result<Vec<StoredDocument>>;

    /// Delete a document, or `Error::DocumentNotFound`
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Provider name for logging
    fn name(&self) -> &str;
}
