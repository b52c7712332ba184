//! # Error Types
//!
//! Umbrella error for operations that cross component boundaries (control plane
//! construction, configuration loading in binaries). Component errors stay typed
//! in their own modules and convert into [`OutreachError`] via `From`.

use thiserror::Error;

use crate::config::ConfigurationError;
use crate::degradation::DegradationError;
use crate::resilience::ResilienceError;

/// Result alias used at component boundaries
pub type OutreachResult<T> = Result<T, OutreachError>;

/// Errors surfaced by the outreach control plane
#[derive(Debug, Error)]
pub enum OutreachError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Resilience error: {0}")]
    Resilience(#[from] ResilienceError),

    #[error("Degradation error: {0}")]
    Degradation(#[from] DegradationError),

    #[error("Learning error: {0}")]
    Learning(String),

    #[error("Drift detection error: {0}")]
    Drift(String),

    #[error("Assurance error: {0}")]
    Assurance(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl OutreachError {
    /// Create a learning error
    pub fn learning(message: impl Into<String>) -> Self {
        Self::Learning(message.into())
    }

    /// Create a drift detection error
    pub fn drift(message: impl Into<String>) -> Self {
        Self::Drift(message.into())
    }

    /// Create an assurance error
    pub fn assurance(message: impl Into<String>) -> Self {
        Self::Assurance(message.into())
    }

    /// Check if error is recoverable (caller can fall back or retry later)
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            OutreachError::Resilience(e) => e.is_recoverable(),
            OutreachError::Degradation(_) => true,
            _ => false,
        }
    }
}
