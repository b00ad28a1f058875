//! MCP server handler implementation.
//!
//! Routes tool calls to the implementations in [`crate::tools`].

use std::sync::Arc;

use crate::app::App;
use crate::tools::{FetchParams, fetch_impl, status_impl};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The MCP server handler for eggcache.
#[derive(Clone)]
pub struct EggCacheServer {
    app: Arc<App>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl EggCacheServer {
    pub fn new(app: Arc<App>) -> Self {
        Self { app, tool_router: Self::tool_router() }
    }

    /// Fetch a URL through the offline-caching worker.
    #[tool(
        description = "Fetch a URL (or a path on the application origin) through the offline-caching worker. Returns how the request resolved (cache_hit, cache_miss_network_ok, cache_miss_network_fail, network_only, pass_through, uncontrolled) and the response, if any."
    )]
    async fn fetch(&self, params: Parameters<FetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.app, params.0).await
    }

    /// Report lifecycle state and cache contents.
    #[tool(
        description = "Show the worker's lifecycle state, the active cache generation, every generation in the store and the URLs cached in the active one."
    )]
    async fn worker_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.app).await
    }
}

impl ServerHandler for EggCacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "eggcache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
