//! API routes for the ingestion server

pub mod documents;
pub mod ingestion;
pub mod webhook;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::server::state::AppState;

/// Build all API routes
pub fn routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        // Ingestion lifecycle
        .route(
            "/ingestion",
            post(ingestion::create_ingestion).get(ingestion::list_ingestions),
        )
        .route(
            "/ingestion/:id",
            get(ingestion::get_ingestion).delete(ingestion::cancel_ingestion),
        )
        .route(
            "/ingestion/document/:document_id",
            get(ingestion::list_document_ingestions),
        )
        // Worker callbacks
        .route("/ingestion/webhook/status", post(webhook::ingestion_status))
        // Documents, with larger body limit for uploads
        .route(
            "/documents",
            post(documents::upload_document)
                .layer(DefaultBodyLimit::max(max_upload_size))
                .get(documents::list_documents),
        )
        .route(
            "/documents/:id",
            get(documents::get_document)
                .patch(documents::update_document)
                .delete(documents::delete_document),
        )
        .route("/documents/:id/content", get(documents::get_document_content))
        .route("/api/info", get(info))
}

/// API info endpoint
async fn info() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "name": "ingest-orchestrator",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Document ingestion orchestration with webhook status reconciliation",
        "endpoints": {
            "POST /ingestion": "Start ingesting a document",
            "GET /ingestion": "List all ingestion attempts",
            "GET /ingestion/:id": "Get an ingestion attempt",
            "DELETE /ingestion/:id": "Cancel a pending or processing ingestion",
            "GET /ingestion/document/:document_id": "Ingestion history of a document",
            "POST /ingestion/webhook/status": "Worker status callback",
            "POST /documents": "Upload a document (multipart)",
            "GET /documents": "List documents",
            "GET /documents/:id": "Get document details",
            "PATCH /documents/:id": "Update document title or description",
            "GET /documents/:id/content": "Download document content",
            "DELETE /documents/:id": "Delete a document"
        }
    }))
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use crate::config::IngestConfig;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };

    #[tokio::test]
    async fn test_health_and_info() {
        let app = app(IngestConfig::default()).await;

        let (status, body) = app
            .send(Request::get("/health").body(Body::empty()).unwrap())
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK");

        let (status, body) = app
            .send(Request::get("/api/info").body(Body::empty()).unwrap())
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "ingest-orchestrator");
    }
}
