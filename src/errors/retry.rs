use std::future::Future;
use std::time::Duration;

use super::types::ScrapeError;
use tracing::{info, warn};

/// Backoff policy for scrape attempts.
///
/// Delay before attempt `n + 1` is `clamp(base_delay * 2^n, min_delay, max_delay)`
/// plus a uniform jitter in `[0, jitter)`.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub jitter: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(16),
            jitter: Duration::from_millis(1500),
        }
    }
}

impl RetryConfig {
    /// A policy that never sleeps. Used by tests and dry runs.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: Duration::ZERO,
        }
    }

    /// Deterministic part of the delay after the given 0-indexed attempt.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2f64.powi(attempt.min(30) as i32);
        let secs = self.base_delay.as_secs_f64() * factor;
        let secs = secs
            .max(self.min_delay.as_secs_f64())
            .min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(secs)
    }

    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let jitter = if self.jitter.is_zero() {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(rand::random::<f64>() * self.jitter.as_secs_f64())
        };
        self.backoff(attempt) + jitter
    }
}

/// Execute an async operation with retry logic.
///
/// Retries only when the error classifies as retryable and attempts remain.
pub async fn with_retry<F, Fut, T>(
    operation_name: &str,
    config: &RetryConfig,
    mut factory: F,
) -> Result<T, ScrapeError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, ScrapeError>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match factory(attempt).await {
            Ok(result) => {
                if attempt > 0 {
                    info!(operation = operation_name, attempt = attempt + 1, "Succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) => {
                let classification = e.classify();

                if !classification.retryable {
                    warn!(
                        operation = operation_name,
                        error_type = %classification.kind,
                        error = %e,
                        "Non-retryable error, failing immediately"
                    );
                    return Err(e);
                }
                if attempt + 1 >= max_attempts {
                    warn!(
                        operation = operation_name,
                        attempt = attempt + 1,
                        max = max_attempts,
                        error = %e,
                        "Max attempts exhausted"
                    );
                    return Err(e);
                }

                let delay = config.retry_delay(attempt);
                warn!(
                    operation = operation_name,
                    attempt = attempt + 1,
                    max = max_attempts,
                    error_type = %classification.kind,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Retrying after error"
                );

                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
