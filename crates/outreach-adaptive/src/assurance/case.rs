//! Assurance case definitions, runtime status and alert records.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::action::ViolationAction;
use super::AssuranceError;

/// Failure reported by an evidence collector
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct EvidenceError(String);

impl EvidenceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Side-effect-free read returning one scalar
#[derive(Clone)]
pub struct EvidenceCollector(Arc<dyn Fn() -> Result<f64, EvidenceError> + Send + Sync>);

impl EvidenceCollector {
    pub fn new<F>(collect: F) -> Self
    where
        F: Fn() -> Result<f64, EvidenceError> + Send + Sync + 'static,
    {
        Self(Arc::new(collect))
    }

    /// Collector that cannot fail
    pub fn infallible<F>(collect: F) -> Self
    where
        F: Fn() -> f64 + Send + Sync + 'static,
    {
        Self::new(move || Ok(collect()))
    }

    pub fn collect(&self) -> Result<f64, EvidenceError> {
        (self.0)()
    }
}

impl fmt::Debug for EvidenceCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EvidenceCollector(..)")
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[display("low")]
    Low,
    #[default]
    #[display("medium")]
    Medium,
    #[display("high")]
    High,
    #[display("critical")]
    Critical,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    #[default]
    #[display("pending")]
    Pending,
    #[display("passed")]
    Passed,
    #[display("failed")]
    Failed,
    #[display("error")]
    Error,
}

/// A declared claim with its evidence source and acceptable range
#[derive(Debug, Clone, bon::Builder)]
pub struct AssuranceCaseDefinition {
    #[builder(into)]
    pub name: String,
    #[builder(into)]
    pub claim: String,
    pub evidence_collector: EvidenceCollector,
    /// Inclusive lower bound; absent means unbounded
    pub threshold_min: Option<f64>,
    /// Inclusive upper bound; absent means unbounded
    pub threshold_max: Option<f64>,
    #[builder(into)]
    pub action_on_violation: ViolationAction,
    #[builder(default)]
    pub severity: Severity,
}

impl AssuranceCaseDefinition {
    pub(crate) fn validate(&self) -> Result<(), AssuranceError> {
        let invalid = |reason: &str| AssuranceError::InvalidThresholds {
            case: self.name.clone(),
            reason: reason.to_string(),
        };
        if self.name.trim().is_empty() {
            return Err(AssuranceError::EmptyName);
        }
        if self.threshold_min.is_some_and(f64::is_nan) || self.threshold_max.is_some_and(f64::is_nan) {
            return Err(invalid("thresholds must not be NaN"));
        }
        if let (Some(min), Some(max)) = (self.threshold_min, self.threshold_max) {
            if min > max {
                return Err(invalid("threshold_min exceeds threshold_max"));
            }
        }
        Ok(())
    }

    /// Whether `evidence` lies inside `[threshold_min, threshold_max]`
    pub fn within_thresholds(&self, evidence: f64) -> bool {
        self.threshold_min.map_or(true, |min| evidence >= min)
            && self.threshold_max.map_or(true, |max| evidence <= max)
    }
}

/// Registered case with the state mutated by verification
#[derive(Debug, Clone)]
pub(crate) struct AssuranceCase {
    pub(crate) definition: AssuranceCaseDefinition,
    pub(crate) status: CaseStatus,
    pub(crate) last_verified: Option<DateTime<Utc>>,
    pub(crate) last_evidence: Option<f64>,
    pub(crate) last_error: Option<String>,
}

impl AssuranceCase {
    pub(crate) fn new(definition: AssuranceCaseDefinition) -> Self {
        Self {
            definition,
            status: CaseStatus::Pending,
            last_verified: None,
            last_evidence: None,
            last_error: None,
        }
    }

    pub(crate) fn snapshot(&self) -> CaseSnapshot {
        CaseSnapshot {
            name: self.definition.name.clone(),
            claim: self.definition.claim.clone(),
            threshold_min: self.definition.threshold_min,
            threshold_max: self.definition.threshold_max,
            action_on_violation: self.definition.action_on_violation.label(),
            severity: self.definition.severity,
            status: self.status,
            last_verified: self.last_verified,
            last_evidence: self.last_evidence,
            last_error: self.last_error.clone(),
        }
    }
}

/// Read-only view of a case for reporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseSnapshot {
    pub name: String,
    pub claim: String,
    pub threshold_min: Option<f64>,
    pub threshold_max: Option<f64>,
    pub action_on_violation: String,
    pub severity: Severity,
    pub status: CaseStatus,
    pub last_verified: Option<DateTime<Utc>>,
    pub last_evidence: Option<f64>,
    pub last_error: Option<String>,
}

/// Appended once per violation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub case_name: String,
    pub claim: String,
    pub evidence: f64,
    pub threshold_min: Option<f64>,
    pub threshold_max: Option<f64>,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assurance::BuiltinAction;

    fn definition(min: Option<f64>, max: Option<f64>) -> AssuranceCaseDefinition {
        AssuranceCaseDefinition::builder()
            .name("bounce_rate")
            .claim("Bounce rate stays under 3%")
            .evidence_collector(EvidenceCollector::infallible(|| 0.01))
            .maybe_threshold_min(min)
            .maybe_threshold_max(max)
            .action_on_violation(BuiltinAction::NotifyTeam)
            .build()
    }

    #[test]
    fn test_bounds_are_inclusive_and_optional() {
        let bounded = definition(Some(0.0), Some(0.03));
        assert!(bounded.within_thresholds(0.0));
        assert!(bounded.within_thresholds(0.03));
        assert!(!bounded.within_thresholds(0.031));

        let upper_only = definition(None, Some(0.03));
        assert!(upper_only.within_thresholds(-1_000.0));

        let unbounded = definition(None, None);
        assert!(unbounded.within_thresholds(f64::MAX));
    }

    #[test]
    fn test_builder_defaults_severity() {
        let def = definition(None, Some(0.03));
        assert_eq!(def.severity, Severity::Medium);
        assert_eq!(def.evidence_collector.collect(), Ok(0.01));
    }

    #[test]
    fn test_validation_rejects_inverted_bounds() {
        assert!(matches!(
            definition(Some(1.0), Some(0.5)).validate(),
            Err(AssuranceError::InvalidThresholds { .. })
        ));
        assert!(definition(Some(f64::NAN), None).validate().is_err());
        assert!(definition(Some(0.5), Some(0.5)).validate().is_ok());
    }
}
