//! # Dynamic Assurance
//!
//! Named claims about live system behavior, each backed by an evidence
//! collector and a threshold range, re-verified on a schedule.

pub mod action;
pub mod case;
pub mod notifier;
pub mod verifier;

pub use action::{BuiltinAction, ViolationAction, ViolationCallback};
pub use case::{
    AlertRecord, AssuranceCaseDefinition, CaseSnapshot, CaseStatus, EvidenceCollector,
    EvidenceError, Severity,
};
pub use notifier::{Notifier, TracingNotifier};
pub use verifier::{AssuranceVerifier, VerificationRun};

use outreach_shared::OutreachError;
use thiserror::Error;

/// Registration-time errors; raised at startup, never during verification
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssuranceError {
    #[error("Invalid violation action '{0}': expected pause_operations, notify_team or reduce_throughput")]
    InvalidAction(String),

    #[error("Invalid thresholds for assurance case '{case}': {reason}")]
    InvalidThresholds { case: String, reason: String },

    #[error("Assurance case name must not be empty")]
    EmptyName,
}

impl From<AssuranceError> for OutreachError {
    fn from(err: AssuranceError) -> Self {
        OutreachError::assurance(err.to_string())
    }
}
