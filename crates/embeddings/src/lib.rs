//! # Codescout Embeddings
//!
//! Client for a remote, rate-limited embedding provider.
//!
//! The [`EmbeddingProvider`] trait is the seam the rest of the workspace
//! programs against; [`RemoteEmbeddingClient`] is the production
//! implementation with token-aware batching, paced outbound requests,
//! retry with exponential backoff, and cumulative cost accounting.

mod error;
mod limiter;
mod provider;
mod remote;
mod retry;
mod usage;

pub use error::{EmbeddingError, Result};
pub use limiter::RequestPacer;
pub use provider::{EmbeddingBatch, EmbeddingProvider};
pub use remote::{
    estimate_tokens, token_aware_batches, RemoteEmbeddingClient, RemoteEmbeddingConfig,
    DEFAULT_DIMENSIONS, DEFAULT_ENDPOINT, DEFAULT_MODEL, MAX_BATCH_SIZE, MAX_BATCH_TOKENS,
};
pub use retry::{retry_with_backoff, RetryPolicy};
pub use usage::{UsageSnapshot, UsageTracker, COST_PER_MILLION_TOKENS};
