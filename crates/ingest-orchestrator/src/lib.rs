//! ingest-orchestrator: asynchronous document ingestion with webhook reconciliation
//!
//! Documents are handed to an external processing worker; the worker reports
//! progress back over a webhook. This crate keeps the authoritative record of
//! every ingestion attempt, allows at most one in-flight attempt per document,
//! and drives each attempt through `pending -> processing -> completed | failed`.

pub mod auth;
pub mod config;
pub mod dispatch;
pub mod documents;
pub mod error;
pub mod ledger;
pub mod orchestrator;
pub mod server;
pub mod types;

pub use auth::{Actor, Role};
pub use config::IngestConfig;
pub use error::{Error, Result};
pub use orchestrator::{IngestionOrchestrator, OrchestratorSettings};
pub use types::{
    attempt::{IngestionAttempt, IngestionEvent, IngestionStatus},
    document::StoredDocument,
    request::StatusUpdate,
};
