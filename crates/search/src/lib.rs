//! # Codescout Search
//!
//! Hybrid retrieval over one project's chunk store: vector-similarity and
//! keyword result lists fused by Reciprocal Rank Fusion into a single
//! ranked answer.

mod error;
mod fusion;
mod hybrid;

pub use error::{Result, SearchError};
pub use fusion::{MatchKind, RankedResult, RrfFusion, DEFAULT_RRF_K};
pub use hybrid::{HybridSearch, SearchOutcome, CANDIDATE_MULTIPLIER};
