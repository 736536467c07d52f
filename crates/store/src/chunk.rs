use serde::{Deserialize, Serialize};

/// One contiguous slice of a source file, stored with its embedding.
///
/// `(file_path, chunk_index)` uniquely identifies a chunk within a project;
/// `id` is the canonical rendering of that pair. Paths are relative to the
/// project root with forward slashes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    pub id: String,
    pub file_path: String,
    pub chunk_index: usize,
    pub start_line: usize,
    pub end_line: usize,
    pub content: String,
    pub embedding: Vec<f32>,
    /// Content hash of the whole source file this chunk came from.
    pub file_hash: String,
    pub indexed_at_ms: u64,
}

impl Chunk {
    #[must_use]
    pub fn chunk_id(file_path: &str, chunk_index: usize) -> String {
        format!("{file_path}#{chunk_index}")
    }
}

/// A query hit: the retrievable chunk fields plus the query's score.
///
/// Embeddings are deliberately not carried here; result lists travel
/// through fusion and out to callers, and the vectors would be dead weight.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkHit {
    pub file_path: String,
    pub chunk_index: usize,
    pub start_line: usize,
    pub end_line: usize,
    pub content: String,
    pub score: f32,
}

impl ChunkHit {
    /// Identity key for fusion across result lists.
    #[must_use]
    pub fn key(&self) -> String {
        Chunk::chunk_id(&self.file_path, self.chunk_index)
    }
}

/// Summary counters for one project's store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub file_count: usize,
    pub chunk_count: usize,
    pub last_updated_ms: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn chunk_id_is_path_and_index() {
        assert_eq!(Chunk::chunk_id("src/lib.rs", 2), "src/lib.rs#2");
    }

    #[test]
    fn hit_key_matches_chunk_id() {
        let hit = ChunkHit {
            file_path: "src/main.rs".to_string(),
            chunk_index: 0,
            start_line: 1,
            end_line: 40,
            content: String::new(),
            score: 0.5,
        };
        assert_eq!(hit.key(), Chunk::chunk_id("src/main.rs", 0));
    }
}
