//! eggcache server entry point.
//!
//! Loads configuration, brings the worker up against the SQLite cache store and
//! serves it over the MCP stdio transport. Logging goes to stderr to avoid
//! interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use eggcache_client::{FetchClient, FetchConfig};
use eggcache_core::{AppConfig, CacheDb};
use eggcache_worker::WorkerOptions;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod app;
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
    tracing::info!(cache_name = %config.cache_name, db_path = %config.db_path.display(), "starting eggcache on stdio transport");

    let db = Arc::new(CacheDb::open(&config.db_path).await?);
    let network = Arc::new(FetchClient::new(FetchConfig::from(&config))?);
    let options = WorkerOptions::from_config(&config)?;

    let app = Arc::new(app::App::start(options, &config.script_url, config.origin_url()?, db, network).await?);

    let handler = handler::EggCacheServer::new(app.clone());
    let server = serve_server(handler, stdio()).await?;

    server.waiting().await?;

    // Cache writes started by the last fetches must land before the runtime shuts down.
    app.host.idle().await;
    tracing::info!("pending cache writes settled, exiting");

    Ok(())
}
