//! Retry policies with exponential backoff
//!
//! Wraps a fallible CRM call and retries transient failures, waiting
//! `base_delay * 2^(attempt-1)` plus a uniform jitter between attempts.
//! Authentication failures and local pre-flight errors are never retried.

use super::config::RetryConfig;
use crate::api::error::{CrmError, CrmResult};
use log::{debug, info, warn};
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Retry policy that implements exponential backoff with jitter
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Create a new retry policy with the given configuration
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Get the retry configuration
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Execute an operation with retry logic
    pub async fn execute<F, Fut, T>(&self, operation: F) -> CrmResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = CrmResult<T>>,
    {
        self.execute_with(operation, |attempt, error, delay| {
            warn!(
                "Attempt {} failed, retrying in {}ms: {}",
                attempt,
                delay.as_millis(),
                error
            );
        })
        .await
    }

    /// Execute an operation with retry logic, reporting every scheduled retry
    ///
    /// `on_retry` receives the failed attempt number, its error and the delay
    /// before the next attempt, and is the only place a retry gets logged.
    pub async fn execute_with<F, Fut, T, R>(&self, mut operation: F, mut on_retry: R) -> CrmResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = CrmResult<T>>,
        R: FnMut(u32, &CrmError, Duration),
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            debug!("Executing operation (attempt {}/{})", attempt, max_attempts);

            let error = match operation().await {
                Ok(result) => {
                    if attempt > 1 {
                        info!("Operation succeeded after {} attempts", attempt);
                    }
                    return Ok(result);
                }
                Err(error) => error,
            };

            if attempt >= max_attempts || !error.should_retry() {
                if attempt > 1 {
                    warn!("Operation failed after {} attempts: {}", attempt, error);
                }
                return Err(error);
            }

            let delay = self.calculate_delay(attempt);
            on_retry(attempt, &error, delay);

            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// Deterministic part of the delay after a failed attempt
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.config.base_delay.saturating_mul(1u32 << exponent)
    }

    /// Full delay after a failed attempt, jitter included
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let jitter_ms = self.config.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..jitter_ms))
        };

        self.backoff_delay(attempt) + jitter
    }
}
