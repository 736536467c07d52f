use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Query cannot be empty")]
    EmptyQuery,

    #[error(transparent)]
    Embedding(#[from] codescout_embeddings::EmbeddingError),

    #[error(transparent)]
    Store(#[from] codescout_store::StoreError),
}
