//! offgrid server entry point.
//!
//! Boots the worker for the configured version, then serves MCP on stdio.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use offgrid_client::{FetchClient, FetchConfig};
use offgrid_core::{AppConfig, CacheDb, ClientTracker, Worker};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(version = %config.version, db = %config.db_path.display(), "Starting offgrid server on stdio transport");

    let db = CacheDb::open(&config.db_path).await?;
    let network = FetchClient::new(FetchConfig::from(&config))?;
    let worker = Arc::new(Worker::from_config(
        &config,
        Arc::new(db),
        Arc::new(network),
        Arc::new(ClientTracker::default()),
    )?);

    match worker.boot().await {
        Ok((installed, activated)) => tracing::info!(
            precached = installed.precached.len(),
            deleted = ?activated.deleted,
            "worker activated"
        ),
        Err(e) => tracing::warn!(error = %e, state = %worker.state(), "worker not active; retry with worker_install"),
    }

    let handler = handler::OffgridServer::new(Arc::clone(&worker));
    let server = serve_server(handler, stdio()).await?;
    server.waiting().await?;

    let settled = worker.settle().await;
    tracing::debug!(settled, "background refreshes settled");

    Ok(())
}
