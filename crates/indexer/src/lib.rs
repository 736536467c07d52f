//! # Codescout Indexer
//!
//! Builds and refreshes one project's chunk store.
//!
//! ## Pipeline
//!
//! ```text
//! Project root
//!     │
//!     ├──> File Scanner (.gitignore aware, source extensions)
//!     │      └─> Candidate files
//!     │
//!     ├──> Hash check (unchanged files skip everything below)
//!     │      └─> Changed files
//!     │
//!     ├──> Line-window chunker
//!     │      └─> Chunks
//!     │
//!     └──> Embedding client + chunk store
//!            └─> Searchable index
//! ```
//!
//! [`ProjectWatcher`] feeds debounced file-change batches back into
//! [`Indexer::refresh_paths`] for incremental updates.

mod chunker;
mod error;
mod indexer;
mod scanner;
mod watcher;

pub use chunker::{chunk_lines, FileChunk, MAX_CHUNK_CHARS};
pub use error::{IndexerError, Result};
pub use indexer::{BuildSummary, Indexer};
pub use scanner::{is_source_file, FileScanner, MAX_FILE_SIZE};
pub use watcher::{ProjectWatcher, WatcherConfig};
