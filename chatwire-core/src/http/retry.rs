//! Retry with exponential backoff for upstream calls

use crate::config::RetryPolicy;
use crate::error::{ApiError, ApiResult};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Fraction of the delay added or removed when jitter is enabled
const JITTER_FACTOR: f64 = 0.1;

impl RetryPolicy {
    /// Calculate the delay before retry number `attempt` (zero based)
    pub fn calculate_delay(&self, attempt: u32, error: &ApiError) -> Duration {
        if let Some(retry_after) = error.retry_delay() {
            return retry_after;
        }

        let base_delay = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        let capped_delay = base_delay.min(self.max_delay_ms as f64);

        let delay = if self.jitter {
            let jitter_range = capped_delay * JITTER_FACTOR;
            let jitter = rand::thread_rng().gen_range(-jitter_range..=jitter_range);
            (capped_delay + jitter).max(0.0)
        } else {
            capped_delay
        };

        Duration::from_millis(delay as u64)
    }

    /// Check if we should retry based on the error and attempt count
    pub fn should_retry(&self, error: &ApiError, attempt: u32) -> bool {
        attempt < self.max_retries && error.is_retryable()
    }
}

/// Runs an operation until it succeeds or the policy gives up
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Execute `operation`, returning the last error once retries run out
    pub async fn execute<F, T, Fut>(&self, mut operation: F) -> ApiResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(error) => {
                    if !self.policy.should_retry(&error, attempt) {
                        return Err(error);
                    }

                    let delay = self.policy.calculate_delay(attempt, &error);
                    warn!(
                        attempt = attempt + 1,
                        max_retries = self.policy.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying after error: {}",
                        error
                    );

                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
