use std::time::{Duration, Instant};

/// Enforces a minimum interval between consecutive API calls.
///
/// Owned by a single client instance and driven by sequential callers only:
/// `wait` records the start time of each protected call, so two calls through
/// the same limiter never begin less than `min_interval` apart. The limiter is
/// not shared across client instances and is not safe to drive from concurrent
/// tasks.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_call: Option<Instant>,
}

impl RateLimiter {
    /// Creates a limiter with the given minimum spacing between calls.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: None,
        }
    }

    /// Blocks until at least `min_interval` has passed since the previous
    /// call, then records the current time as the new call start.
    ///
    /// The first call returns immediately.
    pub async fn wait(&mut self) {
        if let Some(last) = self.last_call {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        self.last_call = Some(Instant::now());
    }
}
