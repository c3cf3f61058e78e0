use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::GenerationConfig;
use crate::error::MockcatError;

/// Bounded retry with linear backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &GenerationConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: config.backoff_base(),
        }
    }

    /// Wait after failed attempt `attempt` (1-based): base × attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or
/// `max_attempts` is reached. `op` receives the 1-based attempt number.
/// The last attempt's error is returned. Backoff waits end early with
/// `Cancelled` when `cancel` fires.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut op: F,
) -> Result<T, MockcatError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, MockcatError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        if cancel.is_cancelled() {
            return Err(MockcatError::Cancelled);
        }

        let err = match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if !err.is_retryable() || attempt >= max_attempts {
            return Err(err);
        }

        let delay = policy.delay_for(attempt);
        tracing::warn!(
            attempt = attempt,
            max_attempts = max_attempts,
            backoff_ms = delay.as_millis() as u64,
            "attempt failed, retrying: {err}"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(MockcatError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }
        attempt += 1;
    }
}
