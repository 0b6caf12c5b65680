//! Retry with exponential backoff

use crate::error::Result;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry configuration with exponential backoff
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,

    /// Delay before the second attempt
    pub initial_backoff: Duration,

    /// Backoff multiplier (2.0 doubles the delay each attempt)
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Set the maximum number of attempts
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the delay before the first retry
    pub fn with_initial_backoff(mut self, initial_backoff: Duration) -> Self {
        self.initial_backoff = initial_backoff;
        self
    }

    /// Backoff to wait after the given (1-based) failed attempt
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let millis = self.initial_backoff.as_millis() as f64
            * self.backoff_multiplier.powi((attempt - 1) as i32);

        Duration::from_millis(millis as u64)
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error,
/// or `max_attempts` is exhausted. The last error is returned on exhaustion.
pub async fn retry_with_backoff<F, Fut, T>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!(attempt, operation = operation_name, "succeeded after retry");
                }
                return Ok(result);
            }
            Err(err) => {
                let retryable = err.is_retryable();

                warn!(
                    attempt,
                    max_attempts,
                    operation = operation_name,
                    error = %err,
                    retryable,
                    "operation failed"
                );

                if !retryable || attempt >= max_attempts {
                    return Err(err);
                }

                let backoff = config.calculate_backoff(attempt);
                debug!(
                    backoff_ms = backoff.as_millis() as u64,
                    operation = operation_name,
                    "backing off before retry"
                );
                tokio::time::sleep(backoff).await;
            }
        }
    }
}
