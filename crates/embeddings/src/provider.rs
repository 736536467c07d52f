use crate::error::Result;
use crate::usage::UsageSnapshot;
use async_trait::async_trait;

/// Embeddings for one batch of documents plus the tokens they cost.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingBatch {
    pub embeddings: Vec<Vec<f32>>,
    pub total_tokens: u64,
}

impl EmbeddingBatch {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            embeddings: Vec::new(),
            total_tokens: 0,
        }
    }
}

/// Capability boundary for turning text into vectors.
///
/// Documents and queries are embedded with distinct input types because
/// retrieval-tuned models encode them asymmetrically. Implementations own
/// their batching, retry, and rate limiting; callers hand over full text
/// sets and await one terminal result.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed document texts, preserving input order.
    async fn embed_documents(&self, texts: &[String]) -> Result<EmbeddingBatch>;

    /// Embed a single search query.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    fn dimensions(&self) -> usize;

    fn model_name(&self) -> &str;

    /// Cumulative token/cost accounting, when the implementation tracks it.
    fn usage(&self) -> UsageSnapshot {
        UsageSnapshot::default()
    }
}
