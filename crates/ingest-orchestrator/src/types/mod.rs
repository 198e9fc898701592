//! Core types for the ingestion orchestrator

pub mod attempt;
pub mod document;
pub mod request;

pub use attempt::{
    IngestionAttempt, IngestionEvent, IngestionStatus, Metadata, CANCELLED_MESSAGE,
};
pub use document::{DocumentUpdate, NewDocument, StoredDocument};
pub use request::{CreateIngestionRequest, StatusUpdate};
