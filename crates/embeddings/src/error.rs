use thiserror::Error;

pub type Result<T> = std::result::Result<T, EmbeddingError>;

/// Failures from the embedding provider boundary.
///
/// Transient variants are retried internally; callers only see them when a
/// client is configured with a single attempt. Every variant is cheap to
/// clone so a failed build can hand the same outcome to every waiter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EmbeddingError {
    #[error("Embedding API key missing. Set CODESCOUT_API_KEY (or VOYAGE_API_KEY) and retry")]
    MissingCredential,

    #[error("Transient embedding failure: {0}")]
    Transient(String),

    #[error("Embedding provider rate limited the request (retry after {0}s)")]
    RateLimited(u64),

    #[error("Embedding provider failed after {attempts} attempts: {message}")]
    Exhausted { attempts: u32, message: String },

    #[error("Embedding provider rejected the request: {0}")]
    Permanent(String),

    #[error("Invalid embedding response: {0}")]
    InvalidResponse(String),
}

impl EmbeddingError {
    /// Whether this failure is eligible for another attempt.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::RateLimited(_))
    }
}
