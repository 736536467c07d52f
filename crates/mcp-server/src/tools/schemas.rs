use rmcp::schemars;
use serde::Deserialize;

pub const DEFAULT_SEARCH_LIMIT: usize = 10;
pub const MAX_SEARCH_LIMIT: usize = 50;

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchRequest {
    /// Search query (semantic search)
    #[schemars(description = "Natural language search query")]
    pub query: String,

    /// Project directory path
    #[schemars(description = "Project directory path; omit to use the configured default")]
    pub path: Option<String>,

    /// Maximum results (default: 10)
    #[schemars(description = "Maximum number of results (1-50)")]
    pub limit: Option<usize>,

    /// Combine vector and keyword rankings (default: true)
    #[schemars(description = "Fuse keyword matches with vector similarity (default: true)")]
    pub hybrid: Option<bool>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct IndexRequest {
    /// Project directory path
    #[schemars(description = "Project directory path; omit to use the configured default")]
    pub path: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct StatusRequest {
    /// Project directory path
    #[schemars(description = "Inspect one project; omit to list every tracked project")]
    pub path: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct WatchStartRequest {
    /// Project directory path
    #[schemars(description = "Project directory path; omit to use the configured default")]
    pub path: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct WatchStopRequest {
    /// Project directory path
    #[schemars(description = "Stop watching one project; omit to stop all watchers")]
    pub path: Option<String>,
}
