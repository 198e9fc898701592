//! Filesystem document store
//!
//! Layout under the root directory:
//!
//! ```text
//! documents.json        registry of StoredDocument records
//! blobs/<sha256-hex>    content, shared by documents with identical bytes
//! ```

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::DocumentStore;
use crate::error::{Error, Result};
use crate::types::{DocumentUpdate, NewDocument, StoredDocument};

/// Local content-addressable document store
pub struct LocalDocumentStore {
    root: PathBuf,
    documents: DashMap<Uuid, StoredDocument>,
    /// Serializes registry and blob mutations
    write_lock: Mutex<()>,
}

impl LocalDocumentStore {
    /// Open (or create) a store rooted at `root`
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(root.join("blobs")).await?;

        let documents = DashMap::new();
        let registry = root.join("documents.json");
        if tokio::fs::try_exists(&registry).await? {
            let content = tokio::fs::read_to_string(&registry).await?;
            for doc in serde_json::from_str::<Vec<StoredDocument>>(&content)? {
                documents.insert(doc.id, doc);
            }
        }

        tracing::info!(
            "Loaded {} documents from {}",
            documents.len(),
            registry.display()
        );

        Ok(Self {
            root,
            documents,
            write_lock: Mutex::new(()),
        })
    }

    fn blob_path(&self, content_hash: &str) -> PathBuf {
        self.root.join("blobs").join(content_hash)
    }

    fn registry_path(&self) -> PathBuf {
        self.root.join("documents.json")
    }

    /// Persist the registry; caller holds `write_lock`
    async fn save_registry(&self) -> Result<()> {
        let mut docs: Vec<StoredDocument> =
            self.documents.iter().map(|e| e.value().clone()).collect();
        docs.sort_by_key(|d| d.created_at);

        let content = serde_json::to_string_pretty(&docs)?;
        let tmp = self.root.join("documents.json.tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, self.registry_path()).await?;
        Ok(())
    }

    fn lookup(&self, id: Uuid) -> Result<StoredDocument> {
        self.documents
            .get(&id)
            .map(|d| d.value().clone())
            .ok_or_else(|| Error::DocumentNotFound(id.to_string()))
    }
}

/// SHA-256 of `data`, hex encoded
pub fn content_hash(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

async fn write_blob(path: &Path, data: &[u8]) -> Result<()> {
    if tokio::fs::try_exists(path).await? {
        return Ok(());
    }
    tokio::fs::write(path, data).await?;
    Ok(())
}

#[async_trait]
impl DocumentStore for LocalDocumentStore {
    async fn create(&self, document: NewDocument) -> Result<StoredDocument> {
        let hash = content_hash(&document.content);
        let stored = StoredDocument {
            id: Uuid::new_v4(),
            title: document.title,
            description: document.description.filter(|d| !d.trim().is_empty()),
            mime_type: document.mime_type,
            content_hash: hash.clone(),
            size: document.content.len() as u64,
            created_at: Utc::now(),
        };

        let _guard = self.write_lock.lock().await;
        write_blob(&self.blob_path(&hash), &document.content).await?;
        self.documents.insert(stored.id, stored.clone());
        self.save_registry().await?;

        tracing::info!(
            "Stored document {} '{}' ({} bytes, blob {})",
            stored.id,
            stored.title,
            stored.size,
            &hash[..12]
        );
        Ok(stored)
    }

    async fn get(&self, id: Uuid) -> Result<StoredDocument> {
        self.lookup(id)
    }

    async fn read_content(&self, id: Uuid) -> Result<Vec<u8>> {
        let doc = self.lookup(id)?;
        tokio::fs::read(self.blob_path(&doc.content_hash))
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    tracing::warn!("Blob {} missing for document {}", doc.content_hash, id);
                    Error::DocumentNotFound(id.to_string())
                }
                _ => Error::internal(format!("Failed to read content of {}: {}", id, e)),
            })
    }

    async fn update(&self, id: Uuid, update: DocumentUpdate) -> Result<StoredDocument> {
        if matches!(&update.title, Some(t) if t.trim().is_empty()) {
            return Err(Error::bad_request("Document title must not be empty"));
        }

        let _guard = self.write_lock.lock().await;
        let updated = {
            let mut doc = self
                .documents
                .get_mut(&id)
                .ok_or_else(|| Error::DocumentNotFound(id.to_string()))?;
            if let Some(title) = update.title {
                doc.title = title;
            }
            if let Some(description) = update.description {
                doc.description = Some(description).filter(|d| !d.trim().is_empty());
            }
            doc.value().clone()
        };
        self.save_registry().await?;

        tracing::info!("Updated document {} '{}'", id, updated.title);
        Ok(updated)
    }

    async fn list(&self) -> Result<Vec<StoredDocument>> {
        let mut docs: Vec<StoredDocument> =
            self.documents.iter().map(|e| e.value().clone()).collect();
        docs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(docs)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let (_, doc) = self
            .documents
            .remove(&id)
            .ok_or_else(|| Error::DocumentNotFound(id.to_string()))?;
        self.save_registry().await?;

        let shared = self
            .documents
            .iter()
            .any(|e| e.value().content_hash == doc.content_hash);
        if !shared {
            // Registry is already updated; a leftover blob is only wasted space
            if let Err(e) = tokio::fs::remove_file(self.blob_path(&doc.content_hash)).await {
                tracing::warn!("Failed to delete blob for document {}: {}", id, e);
            }
        }

        tracing::info!("Deleted document {}", id);
        Ok(())
    }

    fn name(&self) -> &str {
        "local"
    }
}
