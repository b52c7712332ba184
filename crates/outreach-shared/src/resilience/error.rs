//! Error types for wrapped operations, retries and circuit breakers.

use std::fmt::Display;

use thiserror::Error;

/// Caller-classified failure of a wrapped external operation.
///
/// Collaborators (email clients, enrichment clients) decide which of their
/// failures are transient. Only `Retryable` failures are retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    #[error("retryable failure: {0}")]
    Retryable(String),

    #[error("non-retryable failure: {0}")]
    NonRetryable(String),
}

impl OperationError {
    /// Transient upstream failure, eligible for backoff retry
    pub fn retryable(message: impl Display) -> Self {
        Self::Retryable(message.to_string())
    }

    /// Permanent failure, surfaced immediately
    pub fn non_retryable(message: impl Display) -> Self {
        Self::NonRetryable(message.to_string())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable(_))
    }

    /// The underlying failure message
    pub fn message(&self) -> &str {
        match self {
            Self::Retryable(m) | Self::NonRetryable(m) => m,
        }
    }
}

/// Errors surfaced by retry and circuit breaker wrappers
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResilienceError {
    /// The breaker is open and the call was not attempted. Callers are expected
    /// to take a fallback path (cached data, queue for later).
    #[error("Circuit breaker open for dependency '{dependency}'")]
    CircuitOpen { dependency: String },

    #[error("Max retries exceeded after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded {
        attempts: u32,
        #[source]
        last_error: OperationError,
    },

    #[error("Operation failed: {0}")]
    Operation(#[from] OperationError),

    #[error("Operation cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },
}

impl ResilienceError {
    /// Create a circuit-open error for a dependency
    pub fn circuit_open(dependency: impl Into<String>) -> Self {
        Self::CircuitOpen {
            dependency: dependency.into(),
        }
    }

    /// Whether the caller can recover via a fallback or a later retry
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            ResilienceError::CircuitOpen { .. } => true,
            ResilienceError::MaxRetriesExceeded { .. } => true,
            ResilienceError::Operation(e) => e.is_retryable(),
            ResilienceError::Cancelled { .. } => false,
        }
    }

    /// Whether a circuit breaker should record this outcome as a dependency failure.
    ///
    /// Cancellation says nothing about the dependency, and a nested open breaker
    /// was never attempted.
    pub fn counts_as_failure(&self) -> bool {
        !matches!(
            self,
            ResilienceError::Cancelled { .. } | ResilienceError::CircuitOpen { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_error_classification() {
        let transient = OperationError::retryable("503 from upstream");
        let permanent = OperationError::non_retryable("400 bad request");

        assert!(transient.is_retryable());
        assert!(!permanent.is_retryable());
        assert_eq!(transient.message(), "503 from upstream");
        assert_eq!(permanent.message(), "400 bad request");
    }

    #[test]
    fn test_recoverability() {
        assert!(ResilienceError::circuit_open("clay_api").is_recoverable());
        assert!(ResilienceError::MaxRetriesExceeded {
            attempts: 4,
            last_error: OperationError::retryable("timeout"),
        }
        .is_recoverable());
        assert!(!ResilienceError::from(OperationError::non_retryable("bad")).is_recoverable());
        assert!(!ResilienceError::Cancelled { attempts: 1 }.is_recoverable());
    }

    #[test]
    fn test_failure_accounting() {
        assert!(ResilienceError::from(OperationError::non_retryable("bad")).counts_as_failure());
        assert!(!ResilienceError::Cancelled { attempts: 2 }.counts_as_failure());
        assert!(!ResilienceError::circuit_open("inner").counts_as_failure());
    }

    #[test]
    fn test_max_retries_message_includes_last_error() {
        let err = ResilienceError::MaxRetriesExceeded {
            attempts: 3,
            last_error: OperationError::retryable("connection reset"),
        };
        let message = err.to_string();
        assert!(message.contains("3 attempts"));
        assert!(message.contains("connection reset"));
    }
}
