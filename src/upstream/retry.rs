use reqwest::StatusCode;
use std::time::Duration;

/// Bounded exponential backoff for upstream requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub min_wait: Duration,
    pub max_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            min_wait: Duration::from_secs(1),
            max_wait: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Wait before retry number `retry` (0-based). A server supplied
    /// `Retry-After` wins over the computed value; both are capped at `max_wait`.
    pub fn backoff(&self, retry: u32, retry_after: Option<Duration>) -> Duration {
        let computed = 1u32
            .checked_shl(retry)
            .map(|factor| self.min_wait.saturating_mul(factor))
            .unwrap_or(self.max_wait);

        retry_after
            .unwrap_or(computed)
            .clamp(self.min_wait.min(self.max_wait), self.max_wait)
    }
}

/// 5xx and 429 are worth another attempt, every other status is final.
pub fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}
