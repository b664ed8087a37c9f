// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded retries with exponential backoff.

use crate::domain::Result;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// How many times, and how patiently, to retry a retryable failure.
///
/// Only errors for which [`ConfigError::is_retryable`] holds are retried.
/// The delay before retry `n` (counting from zero) is
/// `base_delay * 2^n`, capped at `max_delay`.
///
/// [`ConfigError::is_retryable`]: crate::domain::ConfigError::is_retryable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// The delay before retry number `attempt`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(16);
        self.base_delay
            .saturating_mul(factor)
            .min(self.max_delay.max(self.base_delay))
    }

    /// Runs `operation` until it succeeds, fails permanently or the retry
    /// budget is spent.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut attempt_fn: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match attempt_fn().await {
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = self.delay(attempt);
                    warn!(
                        operation,
                        error = %e,
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying after transient failure"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                outcome => return outcome,
            }
        }
    }
}
