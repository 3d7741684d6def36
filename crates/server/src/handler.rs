//! MCP server handler implementation.
//!
//! This module defines the main server handler that routes tool calls to the
//! worker. Each tool is one lifecycle or fetch event delivered by the host.
use std::sync::Arc;

use crate::tools::cache::{CacheDeleteParams, CacheGetParams, delete_impl, get_impl, list_impl};
use crate::tools::sw_fetch::{SwFetchParams, fetch_impl};
use crate::tools::worker::{activate_impl, install_impl, status_impl};

use offgrid_core::Worker;
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

/// The main MCP server handler for offgrid.
#[derive(Clone)]
pub struct OffgridServer {
    worker: Arc<Worker>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl OffgridServer {
    /// Create a new server handler around a worker.
    pub fn new(worker: Arc<Worker>) -> Self {
        Self { worker, tool_router: Self::tool_router() }
    }

    #[tool(description = "Run the install event: precache the offline page and configured assets into static-<version>. All-or-nothing.")]
    async fn worker_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.worker).await
    }

    #[tool(description = "Run the activate event: delete every cache generation not belonging to the running version and claim clients.")]
    async fn worker_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.worker).await
    }

    #[tool(description = "Report the worker's lifecycle state, current generation names and stored generations.")]
    async fn worker_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.worker).await
    }

    /// Deliver an intercepted request.
    ///
    /// Images and fonts are served cache-first, HTML navigations network-first
    /// with the offline page as last resort, everything else
    /// stale-while-revalidate.
    #[tool(description = "Deliver an intercepted request to the worker. Returns the response with the strategy used and whether it came from cache, network or the offline page.")]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, params.0).await
    }

    #[tool(description = "List cache generations with the URLs each one holds.")]
    async fn cache_list(&self) -> Result<CallToolResult, McpError> {
        list_impl(&self.worker).await
    }

    #[tool(description = "Get the cached response for a URL, from the current generations or a named one.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.worker, params.0).await
    }

    #[tool(description = "Delete a stale cache generation by name. The running version's generations cannot be deleted.")]
    async fn cache_delete(&self, params: Parameters<CacheDeleteParams>) -> Result<CallToolResult, McpError> {
        delete_impl(&self.worker, params.0).await
    }
}

impl ServerHandler for OffgridServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "offgrid".into(),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::idle_worker;

    #[tokio::test]
    async fn test_router_lists_every_tool() {
        let (worker, _network) = idle_worker().await;
        let server = OffgridServer::new(worker);

        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();

        assert_eq!(
            names,
            vec![
                "cache_delete",
                "cache_get",
                "cache_list",
                "sw_fetch",
                "worker_activate",
                "worker_install",
                "worker_status"
            ]
        );
    }

    #[tokio::test]
    async fn test_server_info() {
        let (worker, _network) = idle_worker().await;
        let info = OffgridServer::new(worker).get_info();
        assert_eq!(info.server_info.name, "offgrid");
    }
}
