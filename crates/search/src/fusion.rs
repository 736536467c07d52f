use codescout_store::ChunkHit;
use std::collections::HashMap;

/// RRF constant smoothing rank-1 dominance.
pub const DEFAULT_RRF_K: f32 = 60.0;

/// Which ranking(s) a fused result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Vector,
    Keyword,
    Hybrid,
}

impl MatchKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Vector => "vector",
            Self::Keyword => "keyword",
            Self::Hybrid => "hybrid",
        }
    }
}

/// One entry in the fused ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedResult {
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub content: String,
    pub score: f32,
    pub match_kind: MatchKind,
}

/// Reciprocal Rank Fusion over the vector and keyword rankings.
///
/// Fused score of a chunk is `Σ 1 / (k + rank + 1)` over the lists it
/// appears in; a chunk present in both lists accumulates both terms.
pub struct RrfFusion {
    k: f32,
}

impl Default for RrfFusion {
    fn default() -> Self {
        Self::new(DEFAULT_RRF_K)
    }
}

struct Accumulated {
    result: RankedResult,
    in_vector: bool,
    in_keyword: bool,
}

impl RrfFusion {
    #[must_use]
    pub const fn new(k: f32) -> Self {
        Self { k }
    }

    /// Fuse the two rankings into one list, best first.
    ///
    /// Ties keep first-seen order: accumulation is insertion-ordered and
    /// the final sort is stable, so re-running fusion on the same inputs
    /// always yields the same output.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn fuse(&self, vector: &[ChunkHit], keyword: &[ChunkHit]) -> Vec<RankedResult> {
        let mut entries: Vec<Accumulated> = Vec::with_capacity(vector.len() + keyword.len());
        let mut index_by_key: HashMap<String, usize> = HashMap::new();

        let mut accumulate = |hits: &[ChunkHit], from_vector: bool| {
            for (rank, hit) in hits.iter().enumerate() {
                let rrf_score = 1.0 / (self.k + rank as f32 + 1.0);
                let slot = *index_by_key.entry(hit.key()).or_insert_with(|| {
                    entries.push(Accumulated {
                        result: RankedResult {
                            file_path: hit.file_path.clone(),
                            start_line: hit.start_line,
                            end_line: hit.end_line,
                            content: hit.content.clone(),
                            score: 0.0,
                            match_kind: MatchKind::Vector,
                        },
                        in_vector: false,
                        in_keyword: false,
                    });
                    entries.len() - 1
                });
                let entry = &mut entries[slot];
                entry.result.score += rrf_score;
                if from_vector {
                    entry.in_vector = true;
                } else {
                    entry.in_keyword = true;
                }
            }
        };
        accumulate(vector, true);
        accumulate(keyword, false);

        let mut fused: Vec<RankedResult> = entries
            .into_iter()
            .map(|entry| {
                let match_kind = match (entry.in_vector, entry.in_keyword) {
                    (true, true) => MatchKind::Hybrid,
                    (false, true) => MatchKind::Keyword,
                    _ => MatchKind::Vector,
                };
                RankedResult {
                    match_kind,
                    ..entry.result
                }
            })
            .collect();

        // sort_by is stable: equal scores keep insertion order.
        fused.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        fused
    }
}
