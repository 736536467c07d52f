use crate::error::{Result, SearchError};
use crate::fusion::{MatchKind, RankedResult, RrfFusion};
use codescout_embeddings::EmbeddingProvider;
use codescout_store::ChunkStore;
use std::sync::Arc;

/// Candidate pool per ranking, as a multiple of the requested limit.
pub const CANDIDATE_MULTIPLIER: usize = 4;

/// A fused, truncated ranking plus the pool sizes consulted.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub results: Vec<RankedResult>,
    pub vector_pool: usize,
    pub keyword_pool: usize,
}

/// Hybrid search over one project's chunk store.
///
/// The query is embedded once with the query input type; vector and
/// keyword retrieval run independently over an oversized candidate pool
/// and their rankings fuse through RRF.
pub struct HybridSearch {
    store: Arc<dyn ChunkStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    fusion: RrfFusion,
}

impl HybridSearch {
    pub fn new(store: Arc<dyn ChunkStore>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            store,
            embedder,
            fusion: RrfFusion::default(),
        }
    }

    /// Run a query, returning at most `limit` results scored in `0..=1`.
    ///
    /// With `hybrid` off, keyword retrieval is skipped entirely and the
    /// ranking is vector-only.
    pub async fn search(&self, query: &str, limit: usize, hybrid: bool) -> Result<SearchOutcome> {
        if query.trim().is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        let limit = limit.max(1);
        let pool = limit * CANDIDATE_MULTIPLIER.max(4);
        log::debug!("hybrid search: query='{query}', limit={limit}, pool={pool}, hybrid={hybrid}");

        let query_embedding = self.embedder.embed_query(query).await?;
        let vector_hits = self.store.query_vector(&query_embedding, pool).await?;
        log::debug!("vector ranking: {} candidates", vector_hits.len());

        let mut outcome = if hybrid {
            let keyword_hits = self.store.query_keyword(query, pool).await?;
            log::debug!("keyword ranking: {} candidates", keyword_hits.len());
            SearchOutcome {
                results: self.fusion.fuse(&vector_hits, &keyword_hits),
                vector_pool: vector_hits.len(),
                keyword_pool: keyword_hits.len(),
            }
        } else {
            SearchOutcome {
                vector_pool: vector_hits.len(),
                keyword_pool: 0,
                results: vector_hits
                    .into_iter()
                    .map(|hit| RankedResult {
                        file_path: hit.file_path,
                        start_line: hit.start_line,
                        end_line: hit.end_line,
                        content: hit.content,
                        score: hit.score,
                        match_kind: MatchKind::Vector,
                    })
                    .collect(),
            }
        };

        normalize_scores(&mut outcome.results);
        outcome.results.truncate(limit);
        log::debug!("search produced {} result(s)", outcome.results.len());
        Ok(outcome)
    }
}

/// Min-max normalization into `0..=1`. A single score (or all-equal
/// scores) maps to 1.0.
fn normalize_scores(results: &mut [RankedResult]) {
    let Some(first) = results.first() else {
        return;
    };
    let mut min = first.score;
    let mut max = first.score;
    for result in results.iter() {
        min = min.min(result.score);
        max = max.max(result.score);
    }

    const MIN_DELTA: f32 = 1e-6;
    if (max - min).abs() < MIN_DELTA {
        for result in results {
            result.score = 1.0;
        }
        return;
    }
    let range = max - min;
    for result in results {
        result.score = (result.score - min) / range;
    }
}
