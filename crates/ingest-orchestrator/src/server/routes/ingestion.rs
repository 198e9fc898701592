//! Ingestion lifecycle endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::auth::Actor;
use crate::error::{Error, Result};
use crate::server::extract::{parse_id, JsonBody};
use crate::server::state::AppState;
use crate::types::{CreateIngestionRequest, IngestionAttempt};

/// POST /ingestion - Start ingesting a document
pub async fn create_ingestion(
    State(state): State<AppState>,
    actor: Actor,
    JsonBody(request): JsonBody<CreateIngestionRequest>,
) -> Result<(StatusCode, Json<IngestionAttempt>)> {
    actor.ensure_can_ingest()?;
    let document_id = parse_id(&request.document_id, Error::DocumentNotFound)?;
    let attempt = state
        .orchestrator()
        .request_ingestion(document_id, &actor)
        .await?;
    Ok((StatusCode::CREATED, Json(attempt)))
}

/// GET /ingestion - List all attempts
pub async fn list_ingestions(
    State(state): State<AppState>,
    _actor: Actor,
) -> Result<Json<Vec<IngestionAttempt>>> {
    Ok(Json(state.orchestrator().list_all()?))
}

/// GET /ingestion/:id - Get one attempt
pub async fn get_ingestion(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<String>,
) -> Result<Json<IngestionAttempt>> {
    let id = parse_id(&id, Error::IngestionNotFound)?;
    Ok(Json(state.orchestrator().get(id)?))
}

/// GET /ingestion/document/:document_id - Attempts for a document
pub async fn list_document_ingestions(
    State(state): State<AppState>,
    _actor: Actor,
    Path(document_id): Path<String>,
) -> Result<Json<Vec<IngestionAttempt>>> {
    // An ID that is not a UUID names no document and so has no history
    let attempts = match Uuid::parse_str(&document_id) {
        Ok(document_id) => state.orchestrator().list_by_document(document_id)?,
        Err(_) => Vec::new(),
    };
    Ok(Json(attempts))
}

/// DELETE /ingestion/:id - Cancel an attempt
pub async fn cancel_ingestion(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<Json<IngestionAttempt>> {
    actor.ensure_can_ingest()?;
    let id = parse_id(&id, Error::IngestionNotFound)?;
    Ok(Json(state.orchestrator().cancel(id, &actor).await?))
}
