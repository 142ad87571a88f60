//! Retry policy for replica calls
//!
//! Exponential backoff starting at `min_backoff`, doubling per retry and
//! capped at `max_backoff`. Only transport failures and 5xx answers are
//! retried; 4xx answers are returned to the caller as-is.

use reqwest::StatusCode;
use std::time::Duration;

use contracts::{InvokerConfig, DEFAULT_MAX_RETRY, DEFAULT_RETRY_MIN_BACKOFF_MS, MAX_BACKOFF_FACTOR};

/// Bounded retry configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retry: u32,

    /// Wait before the first retry
    pub min_backoff: Duration,

    /// Upper bound for any single wait
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::with_delays(
            DEFAULT_MAX_RETRY,
            DEFAULT_RETRY_MIN_BACKOFF_MS,
            DEFAULT_RETRY_MIN_BACKOFF_MS * MAX_BACKOFF_FACTOR,
        )
    }
}

impl RetryPolicy {
    /// Create a policy with explicit delays in milliseconds
    pub fn with_delays(max_retry: u32, min_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        Self {
            max_retry,
            min_backoff: Duration::from_millis(min_backoff_ms),
            max_backoff: Duration::from_millis(max_backoff_ms),
        }
    }

    /// Derive the policy from invoker configuration
    pub fn from_config(config: &InvokerConfig) -> Self {
        Self::with_delays(
            config.max_retry,
            config.retry_min_backoff_ms,
            config.retry_max_backoff_ms(),
        )
    }

    /// Total attempts, first call included
    pub fn max_attempts(&self) -> u32 {
        self.max_retry.saturating_add(1)
    }

    /// Wait before retry number `retry` (0-based)
    pub fn backoff(&self, retry: u32) -> Duration {
        let min_ms = self.min_backoff.as_millis() as u64;
        let factor = 1u64.checked_shl(retry).unwrap_or(u64::MAX);
        let delay = Duration::from_millis(min_ms.saturating_mul(factor));
        delay.min(self.max_backoff)
    }

    /// Whether a response status warrants another attempt
    pub fn is_retryable_status(status: StatusCode) -> bool {
        status.is_server_error()
    }
}
