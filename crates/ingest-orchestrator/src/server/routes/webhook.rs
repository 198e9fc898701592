//! Worker status callback

use axum::{extract::State, http::HeaderMap, Json};

use crate::error::{Error, Result};
use crate::server::extract::JsonBody;
use crate::server::state::AppState;
use crate::types::{IngestionAttempt, StatusUpdate};

/// Header carrying the shared webhook secret
pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

/// POST /ingestion/webhook/status - Apply a worker status report
pub async fn ingestion_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(update): JsonBody<StatusUpdate>,
) -> Result<Json<IngestionAttempt>> {
    if let Some(expected) = state.config().worker.webhook_secret.as_deref() {
        let provided = headers
            .get(WEBHOOK_SECRET_HEADER)
            .and_then(|v| v.to_str().ok());
        if provided != Some(expected) {
            tracing::warn!(
                "Rejected status callback for document {}: bad webhook secret",
                update.external_id
            );
            return Err(Error::Unauthorized("invalid webhook secret".to_string()));
        }
    }

    tracing::debug!(
        "Status callback for document {}: {}",
        update.external_id,
        update.status
    );

    Ok(Json(state.orchestrator().reconcile(&update).await?))
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::WEBHOOK_SECRET_HEADER;
    use crate::auth::{Actor, Role};
    use crate::config::IngestConfig;
    use crate::documents::DocumentStore;
    use crate::types::{IngestionStatus, NewDocument};
    use axum::http::{Request, StatusCode};
    use serde_json::json;
    use std::time::Duration;
    use uuid::Uuid;

    fn callback() -> axum::http::request::Builder {
        Request::post("/ingestion/webhook/status").header("content-type", "application/json")
    }

    async fn processing_attempt(app: &TestApp) -> (Uuid, Uuid) {
        let doc = app
            .state
            .documents()
            .create(NewDocument {
                title: "datasheet".into(),
                description: None,
                mime_type: "text/plain".into(),
                content: b"specs".to_vec(),
            })
            .await
            .unwrap();
        let attempt = app
            .state
            .orchestrator()
            .request_ingestion(doc.id, &Actor::new("e", Role::Editor))
            .await
            .unwrap();

        for _ in 0..100 {
            if app.state.orchestrator().get(attempt.id).unwrap().status
                == IngestionStatus::Processing
            {
                return (doc.id, attempt.id);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("ingestion never reached processing");
    }

    #[tokio::test]
    async fn test_completed_callback() {
        let app = app(IngestConfig::default()).await;
        let (doc_id, attempt_id) = processing_attempt(&app).await;

        let payload = json!({
            "externalId": doc_id,
            "status": "COMPLETED",
            "chunksProcessed": 10,
            "totalChunks": 10
        });
        let (status, body) = app
            .send(callback().body(json_body(payload)).unwrap())
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], json!(attempt_id));
        assert_eq!(body["status"], "completed");
        assert_eq!(body["metadata"], json!({"chunksProcessed": 10, "totalChunks": 10}));
        assert!(body["completedAt"].is_string());
    }

    #[tokio::test]
    async fn test_unknown_document_is_not_found() {
        let app = app(IngestConfig::default()).await;
        let payload = json!({ "externalId": Uuid::new_v4(), "status": "completed" });

        let (status, body) = app
            .send(callback().body(json_body(payload)).unwrap())
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["type"], "not_found");
    }

    #[tokio::test]
    async fn test_secret_required_when_configured() {
        let mut config = IngestConfig::default();
        config.worker.webhook_secret = Some("s3cret".into());
        let app = app(config).await;
        let (doc_id, _) = processing_attempt(&app).await;
        let payload = json!({ "externalId": doc_id, "status": "FAILED", "errorMessage": "boom" });

        let (status, _) = app
            .send(callback().body(json_body(payload.clone())).unwrap())
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = app
            .send(
                callback()
                    .header(WEBHOOK_SECRET_HEADER, "wrong")
                    .body(json_body(payload.clone()))
                    .unwrap(),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = app
            .send(
                callback()
                    .header(WEBHOOK_SECRET_HEADER, "s3cret")
                    .body(json_body(payload))
                    .unwrap(),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "failed");
        assert_eq!(body["errorMessage"], "boom");
    }

    #[tokio::test]
    async fn test_non_uuid_external_id_is_not_found() {
        let app = app(IngestConfig::default()).await;
        let payload = json!({ "externalId": "doc-1", "status": "COMPLETED" });

        let (status, body) = app
            .send(callback().body(json_body(payload)).unwrap())
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["type"], "not_found");
    }

    #[tokio::test]
    async fn test_unparseable_payload_is_bad_request() {
        let app = app(IngestConfig::default()).await;

        let (status, body) = app
            .send(callback().body(axum::body::Body::from("{not json")).unwrap())
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "bad_request");
    }
}
