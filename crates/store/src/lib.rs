//! # Codescout Store
//!
//! Per-project chunk storage for semantic code search.
//!
//! A [`ChunkStore`] persists code chunks together with their embedding
//! vectors and answers two kinds of queries: vector similarity (cosine)
//! and keyword match. One store instance corresponds to one project root;
//! the on-disk layout is keyed by a stable hash of the canonical project
//! path so a later process can reattach the same data.

mod chunk;
mod error;
mod json_store;
mod store;

pub use chunk::{Chunk, ChunkHit, StoreStats};
pub use error::{Result, StoreError};
pub use json_store::{store_dir_for_project, JsonChunkStore};
pub use store::ChunkStore;

/// Lowercase hex encoding without an extra dependency.
#[must_use]
pub fn hex_encode_lower(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::hex_encode_lower;
    use pretty_assertions::assert_eq;

    #[test]
    fn hex_encoding_is_lowercase_and_padded() {
        assert_eq!(hex_encode_lower(&[0x00, 0xff, 0x0a]), "00ff0a");
        assert_eq!(hex_encode_lower(&[]), "");
    }
}
