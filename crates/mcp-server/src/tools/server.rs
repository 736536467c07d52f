use super::envelope::{tool_failure, tool_success};
use super::schemas::{
    IndexRequest, SearchRequest, StatusRequest, WatchStartRequest, WatchStopRequest,
    DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT,
};
use codescout_registry::SearchService;
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::*,
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler,
};
use std::sync::Arc;

/// The MCP-facing router over the shared [`SearchService`].
pub struct CodescoutService {
    service: Arc<SearchService>,
    tool_router: ToolRouter<CodescoutService>,
}

#[tool_router]
impl CodescoutService {
    #[must_use]
    pub fn new(service: Arc<SearchService>) -> Self {
        Self {
            service,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        description = "Search a project's code by meaning. Combines vector similarity with keyword matching and returns ranked snippets with file locations. Indexes the project automatically on first use."
    )]
    async fn search(
        &self,
        Parameters(request): Parameters<SearchRequest>,
    ) -> Result<CallToolResult, McpError> {
        let limit = request
            .limit
            .unwrap_or(DEFAULT_SEARCH_LIMIT)
            .clamp(1, MAX_SEARCH_LIMIT);
        let hybrid = request.hybrid.unwrap_or(true);
        let result = self
            .service
            .search(request.path.as_deref(), &request.query, limit, hybrid)
            .await;
        Ok(match result {
            Ok(response) => tool_success(&response),
            Err(err) => tool_failure(&err, request.path.as_deref()),
        })
    }

    #[tool(
        description = "Build or refresh the search index for a project directory. Unchanged files are skipped, so re-indexing is cheap. Concurrent calls for the same project share one build."
    )]
    async fn index(
        &self,
        Parameters(request): Parameters<IndexRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(match self.service.index(request.path.as_deref()).await {
            Ok(response) => tool_success(&response),
            Err(err) => tool_failure(&err, request.path.as_deref()),
        })
    }

    #[tool(
        description = "Report tracked projects: index state, file and chunk counts, freshness, and watcher activity. Never triggers indexing."
    )]
    async fn status(
        &self,
        Parameters(request): Parameters<StatusRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(match self.service.status(request.path.as_deref()).await {
            Ok(response) => tool_success(&response),
            Err(err) => tool_failure(&err, request.path.as_deref()),
        })
    }

    #[tool(
        description = "Watch a project directory and keep its index fresh as files change. Starts with a full build if the project was never indexed."
    )]
    async fn watch_start(
        &self,
        Parameters(request): Parameters<WatchStartRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(match self.service.watch_start(request.path.as_deref()).await {
            Ok(response) => tool_success(&response),
            Err(err) => tool_failure(&err, request.path.as_deref()),
        })
    }

    #[tool(description = "Stop watching one project, or every watched project when no path is given.")]
    async fn watch_stop(
        &self,
        Parameters(request): Parameters<WatchStopRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(match self.service.watch_stop(request.path.as_deref()).await {
            Ok(response) => tool_success(&response),
            Err(err) => tool_failure(&err, request.path.as_deref()),
        })
    }
}

#[tool_handler]
impl ServerHandler for CodescoutService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "codescout-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: Some("Codescout semantic code search".to_string()),
                website_url: None,
                icons: None,
            },
            instructions: Some(MCP_INSTRUCTIONS.to_string()),
        }
    }
}

/// Instructions for AI agents using the codescout tools.
const MCP_INSTRUCTIONS: &str = r#"Codescout - semantic code search across multiple projects

## Purpose
Find code by meaning rather than exact text. Each project gets its own
index; searches against a never-indexed project build the index first.

## Tools
- search: Natural-language query over one project (start here)
- index: Build or refresh a project's index explicitly
- status: See which projects are tracked and how fresh their indexes are
- watch_start / watch_stop: Keep an index fresh while files change

## Tips
- Pass `path` as the project root; omit it to use the server's default.
- First search on a large project takes longer while it indexes; later
  searches are fast and re-index nothing unless files changed.
- Errors carry a stable `code` plus `next_actions` describing the call
  that fixes the problem (usually `index`).
"#;
