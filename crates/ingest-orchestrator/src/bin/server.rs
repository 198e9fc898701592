//! Ingestion server binary
//!
//! Run with: cargo run -p ingest-orchestrator --bin ingest-server

use ingest_orchestrator::{config::IngestConfig, server::IngestServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ingest_orchestrator=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Optional config file as the first argument, else INGEST_CONFIG
    let path = std::env::args_os().nth(1).map(std::path::PathBuf::from);
    let config = IngestConfig::load(path.as_deref())?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Worker: {}", config.worker.base_url);
    tracing::info!("  - Callback: {}", config.worker.callback_url());
    tracing::info!("  - Remote timeout: {}s", config.worker.timeout_secs);
    tracing::info!(
        "  - Ledger: {:?} ({})",
        config.ledger.backend,
        config.ledger.path.display()
    );
    tracing::info!("  - Documents: {}", config.documents.root.display());
    if config.worker.webhook_secret.is_none() {
        tracing::warn!("No webhook secret configured; status callbacks are unauthenticated");
    }

    let server = IngestServer::new(config).await?;

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("  API Info: http://{}/api/info", server.address());
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
