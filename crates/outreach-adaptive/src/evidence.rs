//! Evidence collectors over the control plane's own components.
//!
//! Each collector is a read-only view suitable for an assurance case.

use std::sync::Arc;

use outreach_shared::degradation::DegradationController;
use outreach_shared::resilience::CircuitBreakerRegistry;

use crate::assurance::{EvidenceCollector, EvidenceError};
use crate::drift::DriftDetector;

/// Current degradation level as 0.0–4.0
pub fn degradation_level(controller: Arc<DegradationController>) -> EvidenceCollector {
    EvidenceCollector::infallible(move || f64::from(controller.current_level().as_u8()))
}

/// Number of breakers currently open or half-open
pub fn unhealthy_breakers(registry: Arc<CircuitBreakerRegistry>) -> EvidenceCollector {
    EvidenceCollector::infallible(move || registry.unhealthy_count() as f64)
}

/// Failure rate of one dependency's breaker; 0.0 before its first call
pub fn breaker_failure_rate(
    registry: Arc<CircuitBreakerRegistry>,
    dependency: impl Into<String>,
) -> EvidenceCollector {
    let dependency = dependency.into();
    EvidenceCollector::infallible(move || {
        registry
            .get(&dependency)
            .map_or(0.0, |breaker| breaker.metrics().failure_rate)
    })
}

/// PSI of the latest drift check for `feature`
pub fn latest_psi(detector: Arc<DriftDetector>, feature: impl Into<String>) -> EvidenceCollector {
    let feature = feature.into();
    EvidenceCollector::new(move || {
        detector
            .latest_report(&feature)
            .map(|report| report.psi)
            .ok_or_else(|| EvidenceError::new(format!("no drift check recorded for '{feature}'")))
    })
}

/// Sample mean of the latest drift check for `feature`
pub fn latest_mean(detector: Arc<DriftDetector>, feature: impl Into<String>) -> EvidenceCollector {
    let feature = feature.into();
    EvidenceCollector::new(move || {
        detector
            .latest_report(&feature)
            .map(|report| report.current_mean)
            .ok_or_else(|| EvidenceError::new(format!("no drift check recorded for '{feature}'")))
    })
}
