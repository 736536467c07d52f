use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexerError>;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid project path: {0}")]
    InvalidPath(String),

    #[error(transparent)]
    Embedding(#[from] codescout_embeddings::EmbeddingError),

    #[error(transparent)]
    Store(#[from] codescout_store::StoreError),

    #[error("Watcher error: {0}")]
    Watch(String),

    #[error("{0}")]
    Other(String),
}
