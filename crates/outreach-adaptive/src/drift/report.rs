use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::statistics::Histogram;

/// Frozen reference distribution for one feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineDistribution {
    pub mean: f64,
    pub stddev: f64,
    pub min: f64,
    pub max: f64,
    pub histogram: Histogram,
    pub sample_size: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum PsiSeverity {
    #[display("moderate")]
    Moderate,
    #[display("high")]
    High,
}

/// One fired drift signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DriftSignal {
    MeanShift {
        shift_magnitude: f64,
        baseline_mean: f64,
        current_mean: f64,
    },
    VarianceChange {
        variance_ratio: f64,
    },
    Psi {
        psi: f64,
        severity: PsiSeverity,
    },
}

/// Result of one drift check; never mutated after creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftReport {
    pub feature: String,
    pub timestamp: DateTime<Utc>,
    pub drifts_detected: Vec<DriftSignal>,
    pub has_drift: bool,
    pub sample_size: usize,
    pub current_mean: f64,
    pub shift_magnitude: f64,
    pub variance_ratio: f64,
    pub psi: f64,
}

impl DriftReport {
    pub fn mean_shift_detected(&self) -> bool {
        self.drifts_detected
            .iter()
            .any(|signal| matches!(signal, DriftSignal::MeanShift { .. }))
    }

    pub fn variance_change_detected(&self) -> bool {
        self.drifts_detected
            .iter()
            .any(|signal| matches!(signal, DriftSignal::VarianceChange { .. }))
    }

    /// PSI severity, if the PSI signal fired
    pub fn psi_severity(&self) -> Option<PsiSeverity> {
        self.drifts_detected.iter().find_map(|signal| match signal {
            DriftSignal::Psi { severity, .. } => Some(*severity),
            _ => None,
        })
    }
}
