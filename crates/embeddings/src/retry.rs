use crate::error::{EmbeddingError, Result};
use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Backoff policy for transient provider failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before the next attempt. Rate-limit responses that name a
    /// retry-after window win over the exponential schedule.
    #[must_use]
    pub fn delay_for(&self, attempt: u32, error: &EmbeddingError) -> Duration {
        if let EmbeddingError::RateLimited(secs) = error {
            if *secs > 0 {
                return Duration::from_secs(*secs);
            }
        }
        let exp = self.base_delay.saturating_mul(1u32 << attempt.saturating_sub(1).min(16));
        exp + jitter()
    }
}

// Sub-second smear so concurrent retries don't line up on the same tick.
fn jitter() -> Duration {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    Duration::from_millis(u64::from(nanos % 1000))
}

/// Run `op` until it succeeds, fails permanently, or exhausts the policy.
///
/// Only the calling task suspends during backoff. A transient error on the
/// final attempt is reported as `Exhausted` so callers can tell a dead
/// provider from a momentary blip.
pub async fn retry_with_backoff<T, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < max_attempts => {
                let delay = policy.delay_for(attempt, &err);
                log::warn!(
                    "{what}: attempt {attempt}/{max_attempts} failed ({err}), retrying in {}ms",
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) if err.is_transient() => {
                log::error!("{what}: giving up after {attempt} attempts: {err}");
                return Err(EmbeddingError::Exhausted {
                    attempts: attempt,
                    message: err.to_string(),
                });
            }
            Err(err) => return Err(err),
        }
    }
}
