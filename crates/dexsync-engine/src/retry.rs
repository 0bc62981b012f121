//! Retry policy for remote calls.
//!
//! Transient network-class errors are retried with exponential backoff and
//! jitter; authentication and validation errors are returned immediately.

use std::time::Duration;
use tracing::debug;

use dexsync_core::error::{ProviderError, ProviderResult};

/// Backoff configuration for transient failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts after the initial call.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Multiplier applied per attempt.
    pub multiplier: f64,
    /// Jitter fraction applied to each delay, e.g. `0.2` for plus or minus
    /// 20 percent.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(200),
            multiplier: 2.0,
            jitter: 0.2,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries. Useful in tests.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay for a given attempt (0-indexed), jittered.
    fn delay(&self, attempt: u32) -> Duration {
        use rand::Rng;

        let base = self.base_delay.as_millis() as f64 * self.multiplier.powi(attempt as i32);
        let factor = if self.jitter > 0.0 {
            1.0 + rand::thread_rng().gen_range(-self.jitter..=self.jitter)
        } else {
            1.0
        };
        Duration::from_millis((base * factor) as u64)
    }

    /// Run an operation, retrying transient failures.
    pub async fn run<F, Fut, T>(&self, operation: &str, mut call: F) -> ProviderResult<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = ProviderResult<T>>,
    {
        let mut last_error: Option<ProviderError> = None;

        for attempt in 0..=self.max_retries {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if !e.is_transient() || attempt == self.max_retries {
                        return Err(e);
                    }
                    let delay = self.delay(attempt);
                    debug!(
                        operation = operation,
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying after transient error"
                    );
                    tokio::time::sleep(delay).await;
                    last_error = Some(e);
                }
            }
        }

        // Unreachable: the loop always returns on the final attempt.
        Err(last_error
            .unwrap_or_else(|| ProviderError::remote(operation.to_string(), "retries exhausted")))
    }
}
