//! Document management endpoints

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

use crate::auth::Actor;
use crate::error::{Error, Result};
use crate::server::extract::{parse_id, JsonBody};
use crate::server::state::AppState;
use crate::types::{DocumentUpdate, NewDocument, StoredDocument};

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// POST /documents - Upload a document
///
/// Multipart fields: `file` (required), `title` (defaults to the file name),
/// `description` (optional).
pub async fn upload_document(
    State(state): State<AppState>,
    actor: Actor,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<StoredDocument>)> {
    actor.ensure_can_ingest()?;

    let mut title = None;
    let mut description = None;
    let mut file: Option<(Option<String>, String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::bad_request(format!("Failed to read multipart field: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "title" => title = Some(read_text(field).await?),
            "description" => description = Some(read_text(field).await?),
            "file" => {
                let filename = field.file_name().map(|s| s.to_string());
                let mime_type = field
                    .content_type()
                    .unwrap_or(DEFAULT_MIME_TYPE)
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| Error::bad_request(format!("Failed to read file: {}", e)))?;
                file = Some((filename, mime_type, data.to_vec()));
            }
            other => tracing::debug!("Ignoring multipart field '{}'", other),
        }
    }

    let (filename, mime_type, content) =
        file.ok_or_else(|| Error::bad_request("No file provided"))?;

    let title = title
        .filter(|t| !t.trim().is_empty())
        .or(filename)
        .ok_or_else(|| Error::bad_request("Document title is required"))?;

    let document = state
        .documents()
        .create(NewDocument {
            title,
            description,
            mime_type,
            content,
        })
        .await?;

    tracing::info!("Document {} uploaded by {}", document.id, actor.id);
    Ok((StatusCode::CREATED, Json(document)))
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String> {
    field
        .text()
        .await
        .map_err(|e| Error::bad_request(format!("Failed to read multipart field: {}", e)))
}

/// GET /documents - List documents
pub async fn list_documents(
    State(state): State<AppState>,
    _actor: Actor,
) -> Result<Json<Vec<StoredDocument>>> {
    Ok(Json(state.documents().list().await?))
}

/// GET /documents/:id - Get document details
pub async fn get_document(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<String>,
) -> Result<Json<StoredDocument>> {
    let id = parse_id(&id, Error::DocumentNotFound)?;
    Ok(Json(state.documents().get(id).await?))
}

/// GET /documents/:id/content - Download the document content
pub async fn get_document_content(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let id = parse_id(&id, Error::DocumentNotFound)?;
    let document = state.documents().get(id).await?;
    let content = state.documents().read_content(id).await?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        document.title.replace(['"', '\r', '\n'], "")
    );
    Ok((
        [
            (header::CONTENT_TYPE, document.mime_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        content,
    ))
}

/// PATCH /documents/:id - Update title or description
pub async fn update_document(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    JsonBody(update): JsonBody<DocumentUpdate>,
) -> Result<Json<StoredDocument>> {
    actor.ensure_can_ingest()?;
    let id = parse_id(&id, Error::DocumentNotFound)?;
    let document = state.documents().update(id, update).await?;
    tracing::info!("Document {} updated by {}", id, actor.id);
    Ok(Json(document))
}

/// DELETE /documents/:id - Delete a document
///
/// Ingestion history is kept; only the document and its content go.
pub async fn delete_document(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    actor.ensure_can_ingest()?;
    let id = parse_id(&id, Error::DocumentNotFound)?;
    state.documents().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
