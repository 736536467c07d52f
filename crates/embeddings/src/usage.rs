use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Pricing for the default code-embedding model, USD per million tokens.
pub const COST_PER_MILLION_TOKENS: f64 = 0.18;

const COST_THRESHOLD_LOW: f64 = 5.0;
const COST_THRESHOLD_HIGH: f64 = 10.0;

/// Point-in-time view of cumulative embedding spend.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UsageSnapshot {
    pub total_tokens: u64,
    pub estimated_cost_usd: f64,
}

/// Running token total with one-shot cost warnings.
///
/// Crossing a threshold logs a warning exactly once per process; search and
/// indexing keep going regardless.
#[derive(Debug, Default)]
pub struct UsageTracker {
    total_tokens: AtomicU64,
    low_threshold_fired: AtomicBool,
    high_threshold_fired: AtomicBool,
}

impl UsageTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, tokens: u64) {
        let total = self.total_tokens.fetch_add(tokens, Ordering::Relaxed) + tokens;
        let cost = Self::cost_for(total);
        if cost >= COST_THRESHOLD_HIGH {
            if !self.high_threshold_fired.swap(true, Ordering::Relaxed) {
                log::warn!(
                    "embedding cost crossed ${COST_THRESHOLD_HIGH}: estimated ${cost:.2} across {total} tokens"
                );
            }
        } else if cost >= COST_THRESHOLD_LOW
            && !self.low_threshold_fired.swap(true, Ordering::Relaxed)
        {
            log::warn!(
                "embedding cost crossed ${COST_THRESHOLD_LOW}: estimated ${cost:.2} across {total} tokens"
            );
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> UsageSnapshot {
        let total_tokens = self.total_tokens.load(Ordering::Relaxed);
        UsageSnapshot {
            total_tokens,
            estimated_cost_usd: Self::cost_for(total_tokens),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn cost_for(tokens: u64) -> f64 {
        (tokens as f64 / 1_000_000.0) * COST_PER_MILLION_TOKENS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn snapshot_reports_cumulative_tokens_and_cost() {
        let tracker = UsageTracker::new();
        tracker.record(500_000);
        tracker.record(500_000);
        let snap = tracker.snapshot();
        assert_eq!(snap.total_tokens, 1_000_000);
        assert!((snap.estimated_cost_usd - COST_PER_MILLION_TOKENS).abs() < 1e-9);
    }

    #[test]
    fn thresholds_fire_once() {
        let tracker = UsageTracker::new();
        // ~ $5.04 worth of tokens
        tracker.record(28_000_000);
        assert!(tracker.low_threshold_fired.load(Ordering::Relaxed));
        assert!(!tracker.high_threshold_fired.load(Ordering::Relaxed));

        // push past $10; the low flag stays latched, the high one fires
        tracker.record(28_000_000);
        assert!(tracker.high_threshold_fired.load(Ordering::Relaxed));
    }

    #[test]
    fn zero_usage_is_free() {
        let tracker = UsageTracker::new();
        assert_eq!(tracker.snapshot(), UsageSnapshot::default());
    }
}
