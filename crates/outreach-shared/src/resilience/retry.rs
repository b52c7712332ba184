//! # Retry with Exponential Backoff
//!
//! Runs a caller-classified operation, retrying [`OperationError::Retryable`]
//! failures with `min(max_delay, base_delay * exponential_base^attempt)` plus
//! symmetric jitter. The attempt index starts at 0, so the first retry waits
//! `base_delay`. Non-retryable failures propagate immediately.
//!
//! Backoff sleeps suspend only the calling task. A [`CancellationToken`] is
//! checked before every attempt and raced against every sleep.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::resilience::{OperationError, ResilienceError, RetryPolicy};

impl RetryPolicy {
    /// Un-jittered delay before the retry following failed attempt `attempt`
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let raw = self.base_delay.as_secs_f64() * self.exponential_base.powi(exponent);
        let capped = raw.min(self.max_delay.as_secs_f64());
        if capped.is_finite() && capped >= 0.0 {
            Duration::from_secs_f64(capped)
        } else {
            self.max_delay
        }
    }

    /// Apply symmetric jitter to `delay`.
    ///
    /// `unit` is a uniform sample in `[0, 1)`; the result lies in
    /// `[delay * (1 - jitter_ratio), delay * (1 + jitter_ratio))`.
    pub fn apply_jitter(&self, delay: Duration, unit: f64) -> Duration {
        let factor = 1.0 + self.jitter_ratio * (2.0 * unit.clamp(0.0, 1.0) - 1.0);
        delay.mul_f64(factor.max(0.0))
    }

    /// Jittered delay for `attempt` using the thread-local RNG
    pub fn jittered_delay(&self, attempt: u32) -> Duration {
        self.apply_jitter(self.backoff_delay(attempt), fastrand::f64())
    }
}

/// Named retry wrapper around a [`RetryPolicy`]
#[derive(Debug, Clone)]
pub struct RetryStrategy {
    policy: RetryPolicy,
    operation_name: String,
}

impl RetryStrategy {
    pub fn new(operation_name: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            policy,
            operation_name: operation_name.into(),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute `operation` with this strategy's policy
    pub async fn execute<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        operation: F,
    ) -> Result<T, ResilienceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, OperationError>>,
    {
        run_with_retry(&self.operation_name, &self.policy, cancel, operation).await
    }
}

/// Execute `operation`, retrying transient failures per `policy`.
///
/// Makes at most `policy.max_retries + 1` attempts. Returns
/// [`ResilienceError::MaxRetriesExceeded`] wrapping the last failure once the
/// budget is spent, and [`ResilienceError::Cancelled`] as soon as `cancel` fires
/// between attempts.
pub async fn execute_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    operation: F,
) -> Result<T, ResilienceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, OperationError>>,
{
    run_with_retry("operation", policy, cancel, operation).await
}

async fn run_with_retry<T, F, Fut>(
    operation_name: &str,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<T, ResilienceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, OperationError>>,
{
    let mut attempt: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            debug!(operation = operation_name, attempts = attempt, "Retry loop cancelled");
            return Err(ResilienceError::Cancelled { attempts: attempt });
        }

        let error = match operation().await {
            Ok(value) => return Ok(value),
            Err(error @ OperationError::NonRetryable(_)) => {
                return Err(ResilienceError::Operation(error));
            }
            Err(error) => error,
        };

        let attempts_made = attempt + 1;
        if attempt >= policy.max_retries {
            warn!(
                operation = operation_name,
                attempts = attempts_made,
                error = %error,
                "Retry budget exhausted"
            );
            return Err(ResilienceError::MaxRetriesExceeded {
                attempts: attempts_made,
                last_error: error,
            });
        }

        let delay = policy.jittered_delay(attempt);
        warn!(
            operation = operation_name,
            attempt = attempts_made,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Retryable failure, backing off"
        );

        if cancel.is_cancelled() {
            return Err(ResilienceError::Cancelled {
                attempts: attempts_made,
            });
        }
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(operation = operation_name, attempts = attempts_made, "Retry backoff cancelled");
                return Err(ResilienceError::Cancelled { attempts: attempts_made });
            }
            _ = tokio::time::sleep(delay) => {}
        }

        attempt += 1;
    }
}
