//! Application state for the ingestion server

use std::sync::Arc;

use crate::config::{IngestConfig, LedgerBackend};
use crate::dispatch::{DispatchClient, HttpDispatchClient};
use crate::documents::{DocumentStore, LocalDocumentStore};
use crate::error::Result;
use crate::ledger::{IngestionLedger, MemoryLedger, SqliteLedger};
use crate::orchestrator::{IngestionOrchestrator, OrchestratorSettings};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: IngestConfig,
    /// Ingestion lifecycle
    orchestrator: Arc<IngestionOrchestrator>,
}

impl AppState {
    /// Create application state with the configured backends
    pub async fn new(config: IngestConfig) -> Result<Self> {
        tracing::info!(
            "Initializing ingestion state (ledger backend: {:?})...",
            config.ledger.backend
        );

        let ledger: Arc<dyn IngestionLedger> = match config.ledger.backend {
            LedgerBackend::Memory => {
                tracing::warn!("Using in-memory ledger; attempts are lost on restart");
                Arc::new(MemoryLedger::new())
            }
            LedgerBackend::Sqlite => {
                tracing::info!("Opening ledger at {}", config.ledger.path.display());
                Arc::new(SqliteLedger::new(&config.ledger.path)?)
            }
        };

        let documents: Arc<dyn DocumentStore> =
            Arc::new(LocalDocumentStore::open(config.documents.root.clone()).await?);

        let dispatcher: Arc<dyn DispatchClient> =
            Arc::new(HttpDispatchClient::new(&config.worker)?);
        tracing::info!("Worker client initialized ({})", config.worker.base_url);

        let orchestrator = IngestionOrchestrator::new(
            ledger,
            documents,
            dispatcher,
            OrchestratorSettings::from_config(&config.worker),
        );

        Ok(Self::from_parts(config, Arc::new(orchestrator)))
    }

    /// Assemble state around an existing orchestrator
    pub fn from_parts(config: IngestConfig, orchestrator: Arc<IngestionOrchestrator>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                orchestrator,
            }),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &IngestConfig {
        &self.inner.config
    }

    /// Get the orchestrator
    pub fn orchestrator(&self) -> &IngestionOrchestrator {
        &self.inner.orchestrator
    }

    /// Get the document store
    pub fn documents(&self) -> &Arc<dyn DocumentStore> {
        self.inner.orchestrator.documents()
    }
}
