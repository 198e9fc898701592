//! Ingestion orchestrator
//!
//! Owns the attempt lifecycle: creation under the single-flight rule,
//! background dispatch to the worker, webhook reconciliation and
//! cancellation. All state lives in the ledger; the orchestrator itself only
//! holds handles to its collaborators.

use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::auth::Actor;
use crate::config::WorkerConfig;
use crate::dispatch::{DispatchClient, DispatchRequest};
use crate::documents::DocumentStore;
use crate::error::{Error, Result};
use crate::ledger::IngestionLedger;
use crate::types::{IngestionAttempt, IngestionEvent, StatusUpdate, StoredDocument};

/// Orchestrator settings derived from the worker configuration
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Webhook address handed to the worker with every dispatch
    pub callback_url: String,
    /// Bound on each remote call
    pub remote_timeout: Duration,
}

impl OrchestratorSettings {
    pub fn from_config(config: &WorkerConfig) -> Self {
        Self {
            callback_url: config.callback_url(),
            remote_timeout: config.timeout(),
        }
    }
}

/// Coordinates ingestion attempts between the ledger, document store and worker
pub struct IngestionOrchestrator {
    ledger: Arc<dyn IngestionLedger>,
    documents: Arc<dyn DocumentStore>,
    dispatcher: Arc<dyn DispatchClient>,
    settings: OrchestratorSettings,
}

impl IngestionOrchestrator {
    pub fn new(
        ledger: Arc<dyn IngestionLedger>,
        documents: Arc<dyn DocumentStore>,
        dispatcher: Arc<dyn DispatchClient>,
        settings: OrchestratorSettings,
    ) -> Self {
        tracing::info!(
            "Orchestrator ready (ledger: {}, documents: {}, dispatch: {}, callback: {})",
            ledger.name(),
            documents.name(),
            dispatcher.name(),
            settings.callback_url
        );

        Self {
            ledger,
            documents,
            dispatcher,
            settings,
        }
    }

    /// Start ingesting a document.
    ///
    /// Returns the new PENDING attempt immediately; dispatch to the worker
    /// runs in the background and moves the attempt to PROCESSING or FAILED.
    pub async fn request_ingestion(
        &self,
        document_id: Uuid,
        actor: &Actor,
    ) -> Result<IngestionAttempt> {
        actor.ensure_can_ingest()?;

        let document = self.documents.get(document_id).await?;
        let attempt = match self.ledger.insert_pending(document.id, Utc::now()) {
            Ok(attempt) => attempt,
            Err(Error::Conflict(id)) => {
                if let Ok(Some(existing)) = self.ledger.in_flight_for(id) {
                    tracing::warn!(
                        "Document {} already has ingestion {} ({})",
                        id,
                        existing.id,
                        existing.status
                    );
                }
                return Err(Error::Conflict(id));
            }
            Err(e) => return Err(e),
        };

        tracing::info!(
            "Ingestion {} created for document {} by {}",
            attempt.id,
            document.id,
            actor.id
        );

        self.spawn_dispatch(attempt.id, document);
        Ok(attempt)
    }

    /// Apply a worker status report.
    ///
    /// The worker only knows the document, so the report is applied to the
    /// document's most recent attempt. A late callback for an older attempt
    /// can therefore land on a newer one; attempt correlation is best effort.
    /// An `external_id` that names no known document, including one that is
    /// not a document ID at all, is `Error::NoIngestionForDocument`.
    pub async fn reconcile(&self, update: &StatusUpdate) -> Result<IngestionAttempt> {
        let unknown = || Error::NoIngestionForDocument(update.external_id.clone());
        let document_id = Uuid::parse_str(&update.external_id).map_err(|_| unknown())?;

        let target = self
            .ledger
            .list_by_document(document_id)?
            .into_iter()
            .next()
            .ok_or_else(unknown)?;

        let event = update.event();
        let metadata = update.metadata();
        let now = Utc::now();
        let mut changed = false;

        let attempt = self.ledger.update(target.id, &mut |a| {
            changed = a.apply(&event, now);
            a.merge_metadata(&metadata);
        })?;

        if changed {
            tracing::info!(
                "Ingestion {} for document {} is now {}",
                attempt.id,
                attempt.document_id,
                attempt.status
            );
        } else {
            tracing::debug!(
                "Worker reported {} for ingestion {}; status stays {}",
                update.status,
                attempt.id,
                attempt.status
            );
        }

        Ok(attempt)
    }

    /// Cancel a PENDING or PROCESSING attempt.
    ///
    /// The worker is notified best effort; the attempt is marked FAILED
    /// locally whatever the outcome of that call.
    pub async fn cancel(&self, attempt_id: Uuid, actor: &Actor) -> Result<IngestionAttempt> {
        actor.ensure_can_ingest()?;

        let attempt = self.get(attempt_id)?;
        if attempt.status.is_terminal() {
            return Err(Error::invalid_state(
                "Can only cancel pending or processing ingestions",
            ));
        }

        let notify = self.dispatcher.cancel_remote(attempt.document_id);
        match bounded(self.settings.remote_timeout, notify).await {
            Ok(()) => tracing::info!(
                "Sent cancellation to worker for document {}",
                attempt.document_id
            ),
            Err(e) => tracing::warn!(
                "Failed to cancel ingestion in worker for document {}: {}",
                attempt.document_id,
                e
            ),
        }

        let mut changed = false;
        let updated = self.ledger.update(attempt_id, &mut |a| {
            changed = a.apply(&IngestionEvent::Cancelled, Utc::now());
        })?;

        if changed {
            tracing::info!("Ingestion {} cancelled by {}", attempt_id, actor.id);
        } else {
            tracing::warn!(
                "Ingestion {} reached {} before cancellation was applied",
                attempt_id,
                updated.status
            );
        }

        Ok(updated)
    }

    /// Get an attempt by ID
    pub fn get(&self, attempt_id: Uuid) -> Result<IngestionAttempt> {
        self.ledger
            .get(attempt_id)?
            .ok_or_else(|| Error::IngestionNotFound(attempt_id.to_string()))
    }

    /// All attempts, newest first
    pub fn list_all(&self) -> Result<Vec<IngestionAttempt>> {
        self.ledger.list_all()
    }

    /// Attempts for a document, newest first
    pub fn list_by_document(&self, document_id: Uuid) -> Result<Vec<IngestionAttempt>> {
        self.ledger.list_by_document(document_id)
    }

    pub fn documents(&self) -> &Arc<dyn DocumentStore> {
        &self.documents
    }

    /// Run dispatch for `attempt_id` in the background.
    ///
    /// The attempt ID is captured here; the task never re-resolves it.
    fn spawn_dispatch(&self, attempt_id: Uuid, document: StoredDocument) {
        let task = DispatchTask {
            ledger: Arc::clone(&self.ledger),
            documents: Arc::clone(&self.documents),
            dispatcher: Arc::clone(&self.dispatcher),
            settings: self.settings.clone(),
        };

        tokio::spawn(async move { task.run(attempt_id, document).await });
    }
}

/// Everything a background dispatch needs, detached from the orchestrator
struct DispatchTask {
    ledger: Arc<dyn IngestionLedger>,
    documents: Arc<dyn DocumentStore>,
    dispatcher: Arc<dyn DispatchClient>,
    settings: OrchestratorSettings,
}

impl DispatchTask {
    async fn run(self, attempt_id: Uuid, document: StoredDocument) {
        let event = match self.send(&document).await {
            Ok(()) => {
                tracing::info!("Document {} accepted by worker", document.id);
                IngestionEvent::DispatchSucceeded
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to trigger ingestion for document {}: {}",
                    document.id,
                    e
                );
                IngestionEvent::DispatchFailed {
                    message: format!("Failed to trigger ingestion: {}", e),
                }
            }
        };

        let mut changed = false;
        let result = self.ledger.update(attempt_id, &mut |a| {
            changed = a.apply(&event, Utc::now());
        });

        match result {
            Ok(attempt) if changed => {
                tracing::info!("Ingestion {} is now {}", attempt.id, attempt.status)
            }
            Ok(attempt) => tracing::debug!(
                "Dispatch outcome for ingestion {} ignored; already {}",
                attempt.id,
                attempt.status
            ),
            Err(e) => tracing::error!(
                "Failed to record dispatch outcome for ingestion {}: {}",
                attempt_id,
                e
            ),
        }
    }

    async fn send(&self, document: &StoredDocument) -> Result<()> {
        let content = self.documents.read_content(document.id).await?;

        let request = DispatchRequest {
            external_id: document.id,
            title: document.title.clone(),
            description: document.description.clone().unwrap_or_default(),
            content: String::from_utf8_lossy(&content).into_owned(),
            callback_url: self.settings.callback_url.clone(),
        };

        bounded(
            self.settings.remote_timeout,
            self.dispatcher.dispatch(&request),
        )
        .await
    }
}

/// Run a remote call with a time limit; elapsing counts as failure
async fn bounded<T>(limit: Duration, call: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| Error::Timeout(limit))?
}
