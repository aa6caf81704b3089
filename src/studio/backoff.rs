use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(1000);

/// `2^attempt * base`, no jitter.
pub fn backoff_delay(attempt: u32, base: Duration) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: DEFAULT_BACKOFF_BASE,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Wait after the failed attempt `attempt`, or `None` once the budget is spent.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        (attempt < self.max_retries).then(|| backoff_delay(attempt, self.base_delay))
    }
}

/// Sleeps for `duration` unless `token` fires first. Returns false when cancelled.
pub async fn cancellable_sleep(token: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        biased;
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(duration) => !token.is_cancelled(),
    }
}
