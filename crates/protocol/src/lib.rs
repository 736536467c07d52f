//! Wire types for the codescout tool surface.
//!
//! Everything a dispatcher sends back to callers lives here: tool response
//! payloads, the structured error envelope, and recovery suggestions. The
//! crate is transport-agnostic; serialization is plain serde and every type
//! carries a JSON schema for clients that introspect the tool catalog.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A follow-up call a client can make to recover from an error.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ToolNextAction {
    pub tool: String,
    pub args: serde_json::Value,
    pub reason: String,
}

/// Structured error surfaced by every tool instead of a raw failure.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ErrorEnvelope {
    /// Stable machine-readable code, e.g. `capacity_exceeded`.
    pub code: String,
    /// Human-readable message stating what failed and what to do about it.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub next_actions: Vec<ToolNextAction>,
}

impl ErrorEnvelope {
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            hint: None,
            next_actions: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    #[must_use]
    pub fn with_next_actions(mut self, next_actions: Vec<ToolNextAction>) -> Self {
        self.next_actions = next_actions;
        self
    }
}

/// One ranked hit in a search response.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchItem {
    /// Path relative to the project root, forward slashes.
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub content: String,
    /// Normalized relevance in `0..=1`.
    pub score: f32,
    /// `vector`, `keyword`, or `hybrid` depending on which rankings hit.
    pub match_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchResponse {
    /// Canonical project root the query ran against.
    pub project: String,
    pub count: usize,
    pub results: Vec<SearchItem>,
    pub took_ms: u64,
    /// True when this call had to build the index before searching.
    pub auto_indexed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct IndexResponse {
    pub path: String,
    pub state: String,
    pub file_count: usize,
    pub chunk_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated_ms: Option<u64>,
    /// Cumulative embedding tokens spent by this process.
    pub total_tokens_used: u64,
    pub estimated_cost_usd: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProjectStatusItem {
    pub path: String,
    pub state: String,
    pub file_count: usize,
    pub chunk_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated_ms: Option<u64>,
    pub watching: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StatusResponse {
    pub projects: Vec<ProjectStatusItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WatchStartResponse {
    pub path: String,
    pub watching: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WatchStopResponse {
    pub stopped: bool,
    pub projects_stopped: Vec<String>,
}
