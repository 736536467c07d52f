use crate::chunk::{Chunk, ChunkHit, StoreStats};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;

/// Capability boundary the indexing coordinator and search engine consume.
///
/// One store instance serves one project. Implementations must treat file
/// paths as opaque values compared by equality, never spliced into query
/// text, so paths with quotes or other syntactically loaded characters
/// behave like any other path.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Replace `file_path`'s chunk set with `chunks` in one step.
    ///
    /// Either the new set lands completely or the prior set stays intact;
    /// a partially written file must never become visible.
    async fn upsert_file(&self, file_path: &str, file_hash: &str, chunks: Vec<Chunk>)
        -> Result<()>;

    /// Remove every chunk belonging to `file_path`. Returns how many went.
    async fn delete_by_file(&self, file_path: &str) -> Result<usize>;

    /// Top-`k` chunks by cosine similarity to `embedding`.
    async fn query_vector(&self, embedding: &[f32], k: usize) -> Result<Vec<ChunkHit>>;

    /// Top-`k` chunks by keyword match against `text`.
    async fn query_keyword(&self, text: &str, k: usize) -> Result<Vec<ChunkHit>>;

    /// Indexed file paths with their recorded content hashes.
    ///
    /// Served from the manifest; must not require loading the chunk table.
    async fn indexed_files(&self) -> Result<HashMap<String, String>>;

    async fn stats(&self) -> Result<StoreStats>;

    /// Drop all persisted data, including any corrupted remnants.
    async fn clear(&self) -> Result<()>;

    /// Why this store is unusable, when it failed to parse on open.
    fn corruption(&self) -> Option<String> {
        None
    }
}
