//! worker_status tool implementation.
//!
//! Reports the registration's versions alongside what the cache store holds.

use eggcache_core::Error;
use eggcache_worker::HostStatus;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use crate::app::App;

/// Output from the worker_status tool.
#[derive(Debug, Clone, Serialize)]
pub struct StatusOutput {
    pub registration: HostStatus,
    /// Generation serving fetches, if a version is active.
    pub active_cache_name: Option<String>,
    /// Every generation present in the store, oldest first.
    pub generations: Vec<String>,
    /// URLs stored in the active generation.
    pub cached_urls: Vec<String>,
}

/// Implementation of the worker_status tool.
pub async fn status_impl(app: &App) -> Result<CallToolResult, McpError> {
    let registration = app.host.status().await;
    let active_cache_name = app.host.active_cache_name().await;
    let generations = app.db.generation_names().await?;

    let cached_urls = match &active_cache_name {
        Some(name) => app.db.list_entries(name).await?.into_iter().map(|e| e.url).collect(),
        None => Vec::new(),
    };

    let output = StatusOutput { registration, active_cache_name, generations, cached_urls };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize status: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
