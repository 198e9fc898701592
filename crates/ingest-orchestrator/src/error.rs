//! Error types for the ingestion orchestrator

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Result type alias for orchestrator operations
pub type Result<T> = std::result::Result<T, Error>;

/// Orchestrator errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Document not found in the document store
    #[error("Document with ID {0} not found")]
    DocumentNotFound(String),

    /// Ingestion attempt not found
    #[error("Ingestion with ID {0} not found")]
    IngestionNotFound(String),

    /// Webhook referenced a document with no recorded attempts
    #[error("No ingestion found for document {0}")]
    NoIngestionForDocument(String),

    /// A non-terminal attempt already exists for the document
    #[error("Document {0} is already being ingested")]
    Conflict(Uuid),

    /// Operation not allowed in the attempt's current status
    #[error("{0}")]
    InvalidState(String),

    /// Malformed or incomplete request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// No authenticated actor on the request
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Actor lacks the role required for the operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// External worker unreachable or rejected the request
    #[error("Dispatch failed: {0}")]
    Dispatch(String),

    /// Remote call exceeded its time budget
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// Ledger storage error
    #[error("Database error: {0}")]
    Database(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a dispatch error
    pub fn dispatch(message: impl Into<String>) -> Self {
        Self::Dispatch(message.into())
    }

    /// Create a database error
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database(message.into())
    }

    /// Create an invalid state error
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether this error means the referenced entity does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::DocumentNotFound(_)
                | Error::IngestionNotFound(_)
                | Error::NoIngestionForDocument(_)
        )
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            Error::Config(_) => (StatusCode::BAD_REQUEST, "config_error"),
            Error::DocumentNotFound(_)
            | Error::IngestionNotFound(_)
            | Error::NoIngestionForDocument(_) => (StatusCode::NOT_FOUND, "not_found"),
            Error::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            Error::InvalidState(_) => (StatusCode::BAD_REQUEST, "invalid_state"),
            Error::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            Error::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            Error::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            Error::Dispatch(_) => (StatusCode::BAD_GATEWAY, "dispatch_error"),
            Error::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
            Error::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
            Error::Json(_) => (StatusCode::BAD_REQUEST, "json_error"),
            Error::Http(_) => (StatusCode::BAD_GATEWAY, "http_error"),
            Error::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let id = Uuid::new_v4();
        assert_eq!(
            Error::DocumentNotFound(id.to_string()).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(Error::Conflict(id).into_response().status(), StatusCode::CONFLICT);
        assert_eq!(
            Error::invalid_state("nope").into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::Forbidden("viewer".into()).into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            Error::Timeout(Duration::from_secs(5)).into_response().status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            Error::bad_request("no file").into_response().status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_conflict_message() {
        let id = Uuid::new_v4();
        assert_eq!(
            Error::Conflict(id).to_string(),
            format!("Document {} is already being ingested", id)
        );
    }
}
