//! Request payloads accepted over HTTP

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{IngestionEvent, IngestionStatus, Metadata};

/// Body of `POST /ingestion`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIngestionRequest {
    /// ID of the document to ingest; unparseable IDs name no document
    pub document_id: String,
}

/// Status update posted by the worker to the webhook
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    /// External ID of the document (the document ID sent at dispatch)
    pub external_id: String,
    pub status: IngestionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunks_processed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_chunks: Option<u64>,
}

impl StatusUpdate {
    pub fn new(external_id: impl ToString, status: IngestionStatus) -> Self {
        Self {
            external_id: external_id.to_string(),
            status,
            error_message: None,
            chunks_processed: None,
            total_chunks: None,
        }
    }

    pub fn with_chunks(mut self, processed: u64, total: u64) -> Self {
        self.chunks_processed = Some(processed);
        self.total_chunks = Some(total);
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn event(&self) -> IngestionEvent {
        IngestionEvent::WorkerReported {
            status: self.status,
            error_message: self.error_message.clone(),
        }
    }

    /// Only the counters actually present in the report
    pub fn metadata(&self) -> Metadata {
        let mut metadata = Metadata::new();
        if let Some(processed) = self.chunks_processed {
            metadata.insert("chunksProcessed".to_string(), Value::from(processed));
        }
        if let Some(total) = self.total_chunks {
            metadata.insert("totalChunks".to_string(), Value::from(total));
        }
        metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn test_parse_worker_payload() {
        let id = Uuid::new_v4();
        let update: StatusUpdate = serde_json::from_value(json!({
            "externalId": id,
            "status": "COMPLETED",
            "chunksProcessed": 10,
            "totalChunks": 10
        }))
        .unwrap();

        assert_eq!(update.external_id, id.to_string());
        assert_eq!(update.status, IngestionStatus::Completed);
        assert_eq!(
            Value::Object(update.metadata()),
            json!({"chunksProcessed": 10, "totalChunks": 10})
        );
    }

    #[test]
    fn test_metadata_omits_absent_counters() {
        let update = StatusUpdate {
            chunks_processed: Some(3),
            ..StatusUpdate::new(Uuid::new_v4(), IngestionStatus::Processing)
        };
        let metadata = update.metadata();
        assert_eq!(metadata.len(), 1);
        assert_eq!(metadata["chunksProcessed"], json!(3));
    }

    #[test]
    fn test_external_id_need_not_be_uuid() {
        let update: StatusUpdate =
            serde_json::from_value(json!({ "externalId": "doc-1", "status": "COMPLETED" }))
                .unwrap();
        assert_eq!(update.external_id, "doc-1");

        let request: CreateIngestionRequest =
            serde_json::from_value(json!({ "documentId": "doc-1" })).unwrap();
        assert_eq!(request.document_id, "doc-1");
    }
}
