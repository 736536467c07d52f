use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Process-wide pacing for outbound provider calls.
///
/// Each caller reserves the next free slot under the lock and then sleeps
/// outside it, so excess demand queues in arrival order instead of
/// bursting past the provider ceiling.
#[derive(Debug)]
pub struct RequestPacer {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RequestPacer {
    #[must_use]
    pub fn new(requests_per_minute: u32) -> Self {
        let interval = if requests_per_minute == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs(60) / requests_per_minute
        };
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait for this caller's slot. Zero interval disables pacing.
    pub async fn acquire(&self) {
        if self.interval.is_zero() {
            return;
        }
        let wait = {
            let mut next_slot = self.next_slot.lock().await;
            let now = Instant::now();
            match *next_slot {
                Some(slot) if slot > now => {
                    *next_slot = Some(slot + self.interval);
                    slot - now
                }
                _ => {
                    *next_slot = Some(now + self.interval);
                    Duration::ZERO
                }
            }
        };
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_call_passes_immediately() {
        let pacer = RequestPacer::new(60);
        let start = Instant::now();
        pacer.acquire().await;
        assert_eq!(Instant::now() - start, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn excess_demand_queues_at_the_configured_interval() {
        let pacer = RequestPacer::new(60); // one per second
        let start = Instant::now();
        pacer.acquire().await;
        pacer.acquire().await;
        pacer.acquire().await;
        let elapsed = Instant::now() - start;
        assert!(elapsed >= Duration::from_secs(2), "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn idle_periods_do_not_accumulate_credit() {
        let pacer = RequestPacer::new(60);
        pacer.acquire().await;
        tokio::time::sleep(Duration::from_secs(10)).await;
        let start = Instant::now();
        pacer.acquire().await;
        assert_eq!(Instant::now() - start, Duration::ZERO);
        let queued = Instant::now();
        pacer.acquire().await;
        assert!(Instant::now() - queued >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_rate_disables_pacing() {
        let pacer = RequestPacer::new(0);
        let start = Instant::now();
        for _ in 0..10 {
            pacer.acquire().await;
        }
        assert_eq!(Instant::now() - start, Duration::ZERO);
    }
}
