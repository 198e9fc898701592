//! Configuration for the ingestion orchestrator

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Main orchestrator configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// External processing worker
    pub worker: WorkerConfig,
    /// Ingestion ledger storage
    pub ledger: LedgerConfig,
    /// Document blob store
    pub documents: DocumentStoreConfig,
}

impl IngestConfig {
    /// Load configuration from an optional TOML file, then apply environment overrides.
    ///
    /// `INGEST_CONFIG` names the file when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("INGEST_CONFIG").map(PathBuf::from));

        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(&path).map_err(|e| {
                    Error::Config(format!("Failed to read {}: {}", path.display(), e))
                })?;
                Self::from_toml(&raw)?
            }
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(format!("Invalid config: {}", e)))
    }

    /// Apply overrides from a variable lookup (normally the process environment)
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("INGEST_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("INGEST_PORT") {
            self.server.port = port
                .parse()
                .map_err(|e| Error::Config(format!("Invalid INGEST_PORT '{}': {}", port, e)))?;
        }
        if let Some(url) = lookup("WORKER_BASE_URL") {
            self.worker.base_url = url;
        }
        if let Some(url) = lookup("PUBLIC_BASE_URL") {
            self.worker.public_base_url = url;
        }
        if let Some(secret) = lookup("WEBHOOK_SECRET") {
            self.worker.webhook_secret = Some(secret);
        }
        if let Some(path) = lookup("LEDGER_PATH") {
            self.ledger.path = PathBuf::from(path);
        }
        if let Some(root) = lookup("DOCUMENTS_ROOT") {
            self.documents.root = PathBuf::from(root);
        }
        Ok(())
    }

    /// Reject configurations the orchestrator cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.worker.base_url.trim().is_empty() {
            return Err(Error::Config("worker.base_url must not be empty".to_string()));
        }
        if self.worker.public_base_url.trim().is_empty() {
            return Err(Error::Config(
                "worker.public_base_url must not be empty".to_string(),
            ));
        }
        if self.worker.timeout_secs == 0 {
            return Err(Error::Config("worker.timeout_secs must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum document upload size in bytes (default: 50MB)
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            enable_cors: true,
            max_upload_size: 50 * 1024 * 1024,
        }
    }
}

/// External processing worker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Base URL of the worker's HTTP API
    pub base_url: String,
    /// Address the worker uses to reach this service
    pub public_base_url: String,
    /// Path of the status webhook on this service
    pub callback_path: String,
    /// Bound on every remote call (dispatch and cancellation notify)
    pub timeout_secs: u64,
    /// Shared secret expected in `x-webhook-secret`, if set
    pub webhook_secret: Option<String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            public_base_url: "http://localhost:3000".to_string(),
            callback_path: "/ingestion/webhook/status".to_string(),
            timeout_secs: 30,
            webhook_secret: None,
        }
    }
}

impl WorkerConfig {
    /// Full callback address handed to the worker at dispatch time
    pub fn callback_url(&self) -> String {
        format!(
            "{}{}",
            self.public_base_url.trim_end_matches('/'),
            self.callback_path
        )
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Ledger backend selection
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LedgerBackend {
    /// Process-local, lost on restart
    Memory,
    /// SQLite file
    #[default]
    Sqlite,
}

/// Ingestion ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub backend: LedgerBackend,
    /// SQLite database path (ignored for the memory backend)
    pub path: PathBuf,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            backend: LedgerBackend::Sqlite,
            path: data_dir().join("ledger.db"),
        }
    }
}

/// Document store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentStoreConfig {
    /// Root directory holding `blobs/` and the document registry
    pub root: PathBuf,
}

impl Default for DocumentStoreConfig {
    fn default() -> Self {
        Self {
            root: data_dir().join("documents"),
        }
    }
}

fn data_dir() -> PathBuf {
    // Use absolute path so relative working directories don't matter
    dirs::data_local_dir()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/")))
        .join("ingest-orchestrator")
}
