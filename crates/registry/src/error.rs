use codescout_embeddings::EmbeddingError;
use codescout_indexer::IndexerError;
use codescout_search::SearchError;
use codescout_store::StoreError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServiceError>;

/// Failures surfaced by the project service.
///
/// Each variant states what went wrong and what the caller can do about
/// it. The type is cheap to clone because a single failed build hands the
/// same outcome to every request waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Invalid project path: {0}")]
    InvalidPath(String),

    #[error("Embedding API key missing. Set CODESCOUT_API_KEY (or VOYAGE_API_KEY) and retry")]
    MissingCredential,

    #[error("Embedding provider is temporarily unavailable: {0}. Retry shortly")]
    ProviderTransient(String),

    #[error("Embedding provider rejected the request: {0}")]
    ProviderPermanent(String),

    #[error("Index store is corrupted: {0}. Run index to clear and rebuild it")]
    StoreCorruption(String),

    #[error("Project limit reached ({active}/{limit} active). Stop watching or restart to free slots")]
    CapacityExceeded { active: usize, limit: usize },

    #[error("No index available: {0}")]
    NotIndexed(String),

    #[error("Query cannot be empty")]
    EmptyQuery,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<EmbeddingError> for ServiceError {
    fn from(err: EmbeddingError) -> Self {
        match err {
            EmbeddingError::MissingCredential => Self::MissingCredential,
            EmbeddingError::Transient(message) => Self::ProviderTransient(message),
            EmbeddingError::RateLimited(seconds) => {
                Self::ProviderTransient(format!("rate limited, retry after {seconds}s"))
            }
            // Retries are spent by the time an Exhausted error escapes the
            // client, so callers should not loop on it.
            EmbeddingError::Exhausted { attempts, message } => {
                Self::ProviderPermanent(format!("gave up after {attempts} attempts: {message}"))
            }
            EmbeddingError::Permanent(message) | EmbeddingError::InvalidResponse(message) => {
                Self::ProviderPermanent(message)
            }
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Corruption(reason) => Self::StoreCorruption(reason),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<IndexerError> for ServiceError {
    fn from(err: IndexerError) -> Self {
        match err {
            IndexerError::InvalidPath(path) => Self::InvalidPath(path),
            IndexerError::Embedding(inner) => inner.into(),
            IndexerError::Store(inner) => inner.into(),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<SearchError> for ServiceError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::EmptyQuery => Self::EmptyQuery,
            SearchError::Embedding(inner) => inner.into(),
            SearchError::Store(inner) => inner.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_retries_map_to_permanent() {
        let err: ServiceError = EmbeddingError::Exhausted {
            attempts: 4,
            message: "connect timeout".to_string(),
        }
        .into();
        assert!(matches!(err, ServiceError::ProviderPermanent(_)));
    }

    #[test]
    fn rate_limit_maps_to_transient() {
        let err: ServiceError = EmbeddingError::RateLimited(30).into();
        assert!(matches!(err, ServiceError::ProviderTransient(_)));
    }

    #[test]
    fn store_corruption_passes_through_indexer_wrapper() {
        let err: ServiceError =
            IndexerError::Store(StoreError::Corruption("manifest unreadable".to_string())).into();
        assert_eq!(
            err,
            ServiceError::StoreCorruption("manifest unreadable".to_string())
        );
    }
}
