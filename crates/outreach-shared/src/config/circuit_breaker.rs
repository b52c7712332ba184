//! # Resilience Configuration Adapters
//!
//! Conversions from the canonical TOML types to the runtime types used by the
//! resilience module (seconds and milliseconds become `Duration`s).

use std::time::Duration;

use super::{CircuitBreakerComponentConfig, RetrySettings};
use crate::resilience::{CircuitBreakerConfig, RetryPolicy};

impl CircuitBreakerComponentConfig {
    /// Convert to the resilience module's breaker config
    pub fn to_resilience_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            recovery_timeout: Duration::from_secs(self.recovery_timeout_seconds),
            success_threshold: self.success_threshold,
        }
    }
}

impl RetrySettings {
    /// Convert to the resilience module's retry policy
    pub fn to_retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            exponential_base: self.exponential_base,
            jitter_ratio: self.jitter_ratio,
        }
    }
}
