//! Bounded retry policy for calls into external collaborators.
//!
//! Every planner, executor backend, verifier, extractor and generator call goes
//! through a [`RetryPolicy`]. Failures classified as retryable are attempted
//! again after an exponential backoff; the error only surfaces once the
//! attempt budget is spent.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BACKOFF_BASE_MS: u64 = 200;
const DEFAULT_MAX_BACKOFF_MS: u64 = 10_000;

/// Retry configuration as it appears in `config/*.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base_ms: DEFAULT_BACKOFF_BASE_MS,
            max_backoff_ms: DEFAULT_MAX_BACKOFF_MS,
        }
    }
}

/// Fixed attempt count with a doubling backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff_base: Duration,
    max_backoff: Duration,
}

impl RetryPolicy {
    /// Create a policy. `max_attempts` is clamped to at least one.
    pub fn new(max_attempts: u32, backoff_base: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_base,
            max_backoff: Duration::from_millis(DEFAULT_MAX_BACKOFF_MS).max(backoff_base),
        }
    }

    /// Single attempt, no waiting.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Cap the delay between attempts.
    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff.max(self.backoff_base);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the attempt following `failed_attempts` failures.
    pub fn delay_for(&self, failed_attempts: u32) -> Duration {
        let base_ms = self.backoff_base.as_millis();
        if base_ms == 0 || failed_attempts == 0 {
            return Duration::ZERO;
        }
        let shift = (failed_attempts - 1).min(20);
        let backoff_ms = base_ms
            .saturating_mul(1u128 << shift)
            .min(self.max_backoff.as_millis());
        Duration::from_millis(u64::try_from(backoff_ms).unwrap_or(u64::MAX))
    }

    /// Run `call` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is exhausted.
    ///
    /// Exhaustion is reported as [`Error::ExternalCall`] carrying the number of
    /// attempts made and the last failure message.
    pub async fn run<F, Fut, T>(&self, operation: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match call().await {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) if attempt >= self.max_attempts => {
                    tracing::warn!(
                        operation = operation,
                        attempts = attempt,
                        error = %err,
                        "External call failed, retry budget exhausted"
                    );
                    let message = match err {
                        Error::ExternalCall { message, .. } => message,
                        other => other.to_string(),
                    };
                    return Err(Error::ExternalCall {
                        operation: operation.to_string(),
                        attempts: attempt,
                        message,
                    });
                }
                Err(err) => {
                    let delay = self.delay_for(attempt);
                    tracing::debug!(
                        operation = operation,
                        attempt = attempt,
                        retry_in_ms = delay.as_millis() as u64,
                        error = %err,
                        "Retrying external call"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryConfig::default().into()
    }
}

impl From<RetryConfig> for RetryPolicy {
    fn from(config: RetryConfig) -> Self {
        Self::new(config.max_attempts, Duration::from_millis(config.backoff_base_ms))
            .with_max_backoff(Duration::from_millis(config.max_backoff_ms))
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        config.clone().into()
    }
}
