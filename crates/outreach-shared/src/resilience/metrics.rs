//! # Circuit Breaker Metrics
//!
//! Point-in-time snapshot of a breaker's counters. Snapshots are what health
//! reporting and assurance evidence collectors read; they never touch the
//! breaker's live state.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::resilience::CircuitState;

/// Metrics for a single circuit breaker instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerMetrics {
    /// Calls that were allowed through to the dependency
    pub total_calls: u64,

    pub success_count: u64,

    pub failure_count: u64,

    /// Calls rejected without an attempt because the circuit was open
    pub rejected_calls: u64,

    /// Current consecutive failure count
    pub consecutive_failures: u64,

    /// Trial successes accumulated in the current half-open window
    pub half_open_successes: u64,

    /// Number of state transitions since creation
    pub state_transitions: u64,

    /// Total duration of all recorded operations
    pub total_duration: Duration,

    pub current_state: CircuitState,

    /// Calculated failure rate (0.0 to 1.0)
    pub failure_rate: f64,

    /// Calculated success rate (0.0 to 1.0)
    pub success_rate: f64,

    pub average_duration: Duration,
}

impl CircuitBreakerMetrics {
    /// Create new metrics instance with zero values
    pub fn new() -> Self {
        Self {
            total_calls: 0,
            success_count: 0,
            failure_count: 0,
            rejected_calls: 0,
            consecutive_failures: 0,
            half_open_successes: 0,
            state_transitions: 0,
            total_duration: Duration::ZERO,
            current_state: CircuitState::Closed,
            failure_rate: 0.0,
            success_rate: 0.0,
            average_duration: Duration::ZERO,
        }
    }

    /// Fill in the derived rate and average fields from the raw counters
    pub(crate) fn with_derived_rates(mut self) -> Self {
        let recorded = self.success_count + self.failure_count;
        if recorded > 0 {
            self.failure_rate = self.failure_count as f64 / recorded as f64;
            self.success_rate = self.success_count as f64 / recorded as f64;
            self.average_duration =
                Duration::from_secs_f64(self.total_duration.as_secs_f64() / recorded as f64);
        }
        self
    }

    /// Check if metrics indicate healthy operation
    pub fn is_healthy(&self) -> bool {
        match self.current_state {
            // Closed is healthy if failure rate is reasonable
            CircuitState::Closed => self.failure_rate < 0.1,
            CircuitState::Open => false,
            CircuitState::HalfOpen => true,
        }
    }

    /// Get human-readable state description
    pub fn state_description(&self) -> &'static str {
        match self.current_state {
            CircuitState::Closed => "Healthy - Normal operation",
            CircuitState::Open => "Failing - Rejecting all calls",
            CircuitState::HalfOpen => "Recovering - Testing dependency health",
        }
    }

    /// Format metrics for logging
    pub fn format_summary(&self) -> String {
        format!(
            "State: {} | Calls: {} | Success: {:.1}% | Failures: {} | Rejected: {} | Avg Duration: {}ms",
            self.state_description(),
            self.total_calls,
            self.success_rate * 100.0,
            self.failure_count,
            self.rejected_calls,
            self.average_duration.as_millis()
        )
    }
}

impl Default for CircuitBreakerMetrics {
    fn default() -> Self {
        Self::new()
    }
}
