//! Helpers shared by the control plane integration tests
//
// Using #[allow(dead_code)] because not every test target uses every helper.
#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use outreach_core::adaptive::assurance::{AlertRecord, Notifier};
use outreach_core::adaptive::learning::{ActionSpace, PersonalizationDepth};
use outreach_core::adaptive::ControlPlane;
use outreach_core::shared::config::{CircuitBreakerComponentConfig, ControlPlaneConfig};

/// Path of the sample config shipped with the repository
pub fn base_config_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config/outreach/base.toml")
}

/// Twelve campaign actions over three templates, two timings and two depths
pub fn campaign_actions() -> ActionSpace {
    ActionSpace::cartesian(
        &["pain_point", "case_study", "social_proof"],
        &["immediate", "delay_2d"],
        &[PersonalizationDepth::Light, PersonalizationDepth::Deep],
    )
    .expect("non-empty action space")
}

/// Defaults with millisecond retries and a deterministic learner
pub fn fast_config() -> ControlPlaneConfig {
    let mut config = ControlPlaneConfig::default();
    config.retry.max_retries = 2;
    config.retry.base_delay_ms = 10;
    config.retry.max_delay_ms = 100;
    config.learning.seed = Some(42);
    config
}

/// Give `dependency` its own breaker thresholds
pub fn with_breaker(
    mut config: ControlPlaneConfig,
    dependency: &str,
    failure_threshold: u32,
    recovery_timeout_seconds: u64,
) -> ControlPlaneConfig {
    config.circuit_breakers.component_configs.insert(
        dependency.to_string(),
        CircuitBreakerComponentConfig {
            failure_threshold,
            recovery_timeout_seconds,
            success_threshold: 1,
        },
    );
    config
}

/// Notifier that keeps every alert it receives
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    alerts: Mutex<Vec<AlertRecord>>,
}

impl RecordingNotifier {
    pub fn received(&self) -> Vec<AlertRecord> {
        self.alerts.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, alert: &AlertRecord) {
        self.alerts.lock().unwrap().push(alert.clone());
    }
}

/// Control plane whose notifier is returned alongside it
pub fn recording_plane(config: ControlPlaneConfig) -> (ControlPlane, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    let plane = ControlPlane::with_notifier(config, campaign_actions(), notifier.clone())
        .expect("valid control plane config");
    (plane, notifier)
}
