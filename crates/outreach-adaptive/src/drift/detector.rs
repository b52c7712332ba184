//! # Drift Detector
//!
//! Compares live feature samples against frozen baselines with three
//! independent signals: mean shift, variance ratio and PSI. Detected drift is
//! data (a [`DriftReport`]), never an error; only contract violations such as
//! a missing baseline or an unusable sample fail.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

use outreach_shared::config::DriftSettings;
use outreach_shared::OutreachError;

use super::report::{BaselineDistribution, DriftReport, DriftSignal, PsiSeverity};
use super::statistics::{
    mean, min_max, population_stability_index, population_stddev, Histogram, STDDEV_EPSILON,
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DriftError {
    #[error("No baseline set for feature '{feature}'")]
    MissingBaseline { feature: String },

    #[error("Empty sample for feature '{feature}'")]
    EmptySample { feature: String },

    #[error("Non-finite value at index {index} in sample for feature '{feature}'")]
    NonFiniteValue { feature: String, index: usize },
}

impl From<DriftError> for OutreachError {
    fn from(err: DriftError) -> Self {
        OutreachError::drift(err.to_string())
    }
}

/// Callback invoked with every report that detected drift
pub type DriftHandler = Arc<dyn Fn(&DriftReport) + Send + Sync>;

pub struct DriftDetector {
    settings: DriftSettings,
    baselines: RwLock<HashMap<String, BaselineDistribution>>,
    history: Mutex<Vec<DriftReport>>,
    handlers: RwLock<Vec<DriftHandler>>,
}

impl std::fmt::Debug for DriftDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriftDetector")
            .field("settings", &self.settings)
            .field("features", &self.features())
            .field("handlers", &self.handlers.read().map(|h| h.len()).unwrap_or(0))
            .finish()
    }
}

impl DriftDetector {
    pub fn new(settings: DriftSettings) -> Self {
        Self {
            settings,
            baselines: RwLock::new(HashMap::new()),
            history: Mutex::new(Vec::new()),
            handlers: RwLock::new(Vec::new()),
        }
    }

    pub fn settings(&self) -> &DriftSettings {
        &self.settings
    }

    /// Compute and freeze the baseline for `feature`, replacing any previous one
    pub fn set_baseline(
        &self,
        feature: &str,
        values: &[f64],
    ) -> Result<BaselineDistribution, DriftError> {
        validate_sample(feature, values)?;

        let baseline_mean = mean(values);
        let (min, max) = min_max(values);
        let baseline = BaselineDistribution {
            mean: baseline_mean,
            stddev: population_stddev(values, baseline_mean),
            min,
            max,
            histogram: Histogram::from_sample(values, self.settings.histogram_bins),
            sample_size: values.len(),
            created_at: Utc::now(),
        };

        let replaced = self
            .baselines
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .insert(feature.to_string(), baseline.clone())
            .is_some();

        info!(
            feature,
            mean = baseline.mean,
            stddev = baseline.stddev,
            sample_size = baseline.sample_size,
            replaced,
            "Drift baseline set"
        );
        Ok(baseline)
    }

    pub fn baseline(&self, feature: &str) -> Option<BaselineDistribution> {
        self.baselines
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(feature)
            .cloned()
    }

    /// Monitored feature names, sorted
    pub fn features(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .baselines
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Register a callback for reports that detected drift
    pub fn on_drift<F>(&self, handler: F)
    where
        F: Fn(&DriftReport) + Send + Sync + 'static,
    {
        self.handlers
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .push(Arc::new(handler));
    }

    /// Check `current_values` against the baseline of `feature`
    pub fn check_drift(&self, feature: &str, current_values: &[f64]) -> Result<DriftReport, DriftError> {
        let baseline = self
            .baseline(feature)
            .ok_or_else(|| DriftError::MissingBaseline {
                feature: feature.to_string(),
            })?;
        validate_sample(feature, current_values)?;

        let report = self.evaluate(feature, &baseline, current_values);

        self.history
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(report.clone());

        if report.has_drift {
            warn!(
                feature,
                shift_magnitude = report.shift_magnitude,
                variance_ratio = report.variance_ratio,
                psi = report.psi,
                signals = report.drifts_detected.len(),
                "Drift detected"
            );
            let handlers = self
                .handlers
                .read()
                .unwrap_or_else(|p| p.into_inner())
                .clone();
            for handler in handlers {
                handler(&report);
            }
        } else {
            debug!(feature, psi = report.psi, "No drift detected");
        }

        Ok(report)
    }

    fn evaluate(&self, feature: &str, baseline: &BaselineDistribution, values: &[f64]) -> DriftReport {
        let current_mean = mean(values);
        let current_stddev = population_stddev(values, current_mean);
        let mut drifts_detected = Vec::new();

        let shift_magnitude = (current_mean - baseline.mean).abs() / (baseline.stddev + STDDEV_EPSILON);
        if shift_magnitude > self.settings.mean_shift_threshold {
            drifts_detected.push(DriftSignal::MeanShift {
                shift_magnitude,
                baseline_mean: baseline.mean,
                current_mean,
            });
        }

        // Two constant samples have the same (zero) spread
        let variance_ratio = if baseline.stddev < STDDEV_EPSILON && current_stddev < STDDEV_EPSILON {
            1.0
        } else {
            current_stddev / (baseline.stddev + STDDEV_EPSILON)
        };
        if variance_ratio < self.settings.variance_ratio_min
            || variance_ratio > self.settings.variance_ratio_max
        {
            drifts_detected.push(DriftSignal::VarianceChange { variance_ratio });
        }

        let current_counts = baseline.histogram.count(values);
        let psi = population_stability_index(&baseline.histogram.counts, &current_counts);
        if psi > self.settings.psi_threshold {
            let severity = if psi > self.settings.psi_high_threshold {
                PsiSeverity::High
            } else {
                PsiSeverity::Moderate
            };
            drifts_detected.push(DriftSignal::Psi { psi, severity });
        }

        DriftReport {
            feature: feature.to_string(),
            timestamp: Utc::now(),
            has_drift: !drifts_detected.is_empty(),
            drifts_detected,
            sample_size: values.len(),
            current_mean,
            shift_magnitude,
            variance_ratio,
            psi,
        }
    }

    /// Every report produced so far, oldest first
    pub fn history(&self) -> Vec<DriftReport> {
        self.history.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Reports that detected drift, oldest first
    pub fn flagged_history(&self) -> Vec<DriftReport> {
        self.history
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .filter(|report| report.has_drift)
            .cloned()
            .collect()
    }

    pub fn latest_report(&self, feature: &str) -> Option<DriftReport> {
        self.history
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .rev()
            .find(|report| report.feature == feature)
            .cloned()
    }
}

impl Default for DriftDetector {
    fn default() -> Self {
        Self::new(DriftSettings::default())
    }
}

fn validate_sample(feature: &str, values: &[f64]) -> Result<(), DriftError> {
    if values.is_empty() {
        return Err(DriftError::EmptySample {
            feature: feature.to_string(),
        });
    }
    if let Some(index) = values.iter().position(|v| !v.is_finite()) {
        return Err(DriftError::NonFiniteValue {
            feature: feature.to_string(),
            index,
        });
    }
    Ok(())
}
