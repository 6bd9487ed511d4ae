//! Retry With Backoff
//!
//! Wraps a provider call in a per-attempt timeout and retries retryable
//! failures with exponential backoff: 500ms, 1000ms, 2000ms, ... capped at
//! the policy's maximum delay. Non-retryable errors return immediately.

use std::future::Future;
use std::time::Duration;

use crate::types::{LlmError, LlmResult};

/// Base delay between retries (in milliseconds).
pub const RETRY_BASE_DELAY_MS: u64 = 500;

/// Maximum delay cap to prevent excessively long waits.
pub const RETRY_MAX_DELAY_MS: u64 = 10_000;

/// How many times, and how patiently, to retry a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::from_millis(RETRY_BASE_DELAY_MS),
            max_delay: Duration::from_millis(RETRY_MAX_DELAY_MS),
        }
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Wait before the retry that follows a failed `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32, err: &LlmError) -> Duration {
        if let Some(secs) = err.retry_after_secs() {
            return Duration::from_secs(secs).min(self.max_delay);
        }
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy's attempts are used up. Each attempt is bounded by `attempt_timeout`.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    attempt_timeout: Duration,
    label: &str,
    mut op: F,
) -> LlmResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = LlmResult<T>>,
{
    let mut last_err: Option<LlmError> = None;

    for attempt in 0..policy.max_attempts {
        let outcome = match tokio::time::timeout(attempt_timeout, op()).await {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout {
                millis: u64::try_from(attempt_timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        };

        match outcome {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_retryable() {
                    tracing::debug!(label, error = %err, "non-retryable error, giving up");
                    return Err(err);
                }

                if attempt + 1 < policy.max_attempts {
                    let wait = policy.delay_for(attempt, &err);
                    tracing::warn!(
                        label,
                        attempt = attempt + 1,
                        max_attempts = policy.max_attempts,
                        wait_ms = wait.as_millis() as u64,
                        error = %err,
                        "retryable error, backing off"
                    );
                    tokio::time::sleep(wait).await;
                }
                last_err = Some(err);
            }
        }
    }

    Err(last_err.unwrap_or_else(|| LlmError::Other {
        message: "retry attempts exhausted".to_string(),
    }))
}
