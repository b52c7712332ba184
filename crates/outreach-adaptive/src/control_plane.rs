//! # Control Plane
//!
//! Builds every component from one [`ControlPlaneConfig`] and closes the
//! feedback loop between them:
//!
//! ```text
//! CircuitBreakerRegistry ──(transition to open)──► DegradationController
//! DriftDetector ──────────(drift detected)───────► DegradationController ("feature_drift")
//! AssuranceVerifier ──(periodic, violations)─────► DegradationController / Notifier
//! ```
//!
//! Background tasks start with [`ControlPlane::start`] and stop with
//! [`ControlPlane::shutdown`].

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use outreach_shared::config::ControlPlaneConfig;
use outreach_shared::degradation::DegradationController;
use outreach_shared::resilience::{CircuitBreakerRegistry, CircuitState};
use outreach_shared::OutreachResult;

use crate::assurance::{AssuranceVerifier, EvidenceCollector, Notifier, TracingNotifier};
use crate::drift::DriftDetector;
use crate::evidence;
use crate::learning::{ActionSpace, LearningEngine};

/// Degradation component escalated when drift is detected
pub const FEATURE_DRIFT_COMPONENT: &str = "feature_drift";

#[derive(Debug)]
pub struct ControlPlane {
    config: ControlPlaneConfig,
    breakers: Arc<CircuitBreakerRegistry>,
    degradation: Arc<DegradationController>,
    learning: Arc<LearningEngine>,
    drift: Arc<DriftDetector>,
    assurance: Arc<AssuranceVerifier>,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ControlPlane {
    /// Build with the tracing notifier
    pub fn new(config: ControlPlaneConfig, actions: ActionSpace) -> OutreachResult<Self> {
        Self::with_notifier(config, actions, Arc::new(TracingNotifier))
    }

    pub fn with_notifier(
        config: ControlPlaneConfig,
        actions: ActionSpace,
        notifier: Arc<dyn Notifier>,
    ) -> OutreachResult<Self> {
        config.validate()?;

        let breakers = Arc::new(CircuitBreakerRegistry::new(
            config.circuit_breakers.clone(),
            config.retry.to_retry_policy(),
        ));
        let degradation = Arc::new(DegradationController::from_settings(&config.degradation));

        let learning = Arc::new(LearningEngine::new(actions, &config.learning)?);
        if let Some(path) = config.learning.policy_path.as_deref() {
            learning.load_policy(Path::new(path))?;
        }

        let drift = Arc::new(DriftDetector::new(config.drift.clone()));
        if config.drift.escalate_on_drift {
            let degradation = degradation.clone();
            drift.on_drift(move |report| {
                debug!(feature = %report.feature, "Escalating degradation for feature drift");
                degradation.adjust_operation(FEATURE_DRIFT_COMPONENT);
            });
        }

        let assurance = Arc::new(AssuranceVerifier::new(degradation.clone(), notifier));

        info!(
            dependencies_configured = config.circuit_breakers.component_configs.len(),
            actions = learning.action_space().len(),
            escalate_on_drift = config.drift.escalate_on_drift,
            "Control plane initialized"
        );

        Ok(Self {
            config,
            breakers,
            degradation,
            learning,
            drift,
            assurance,
            cancel: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
        })
    }

    pub fn config(&self) -> &ControlPlaneConfig {
        &self.config
    }

    pub fn breakers(&self) -> &Arc<CircuitBreakerRegistry> {
        &self.breakers
    }

    pub fn degradation(&self) -> &Arc<DegradationController> {
        &self.degradation
    }

    pub fn learning(&self) -> &Arc<LearningEngine> {
        &self.learning
    }

    pub fn drift(&self) -> &Arc<DriftDetector> {
        &self.drift
    }

    pub fn assurance(&self) -> &Arc<AssuranceVerifier> {
        &self.assurance
    }

    /// Token cancelled on shutdown; pass it to retries that should stop with the plane
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Spawn the breaker watcher and the periodic assurance loop.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) {
        let watcher = self.spawn_breaker_watcher();
        let interval = Duration::from_secs(self.config.assurance.verification_interval_seconds);
        let verifier = self
            .assurance
            .clone()
            .spawn_periodic(interval, self.cancel.child_token());

        self.tasks
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .extend([watcher, verifier]);
        info!(
            verification_interval_secs = interval.as_secs(),
            "Control plane background tasks started"
        );
    }

    /// Cancel background tasks, wait for them to finish, then persist the policy
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let tasks: Vec<_> = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(|p| p.into_inner()));
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Control plane task ended abnormally");
            }
        }
        if let Err(e) = self.save_policy() {
            error!(error = %e, "Failed to persist learned policy on shutdown");
        }
        info!("Control plane stopped");
    }

    /// Write the learned policy to `learning.policy_path`.
    ///
    /// Returns `false` when no path is configured.
    pub fn save_policy(&self) -> OutreachResult<bool> {
        match self.config.learning.policy_path.as_deref() {
            Some(path) => {
                self.learning.save_policy(Path::new(path))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn spawn_breaker_watcher(&self) -> JoinHandle<()> {
        let mut transitions = self.breakers.subscribe();
        let degradation = self.degradation.clone();
        let cancel = self.cancel.child_token();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    received = transitions.recv() => match received {
                        Ok(transition) if transition.to == CircuitState::Open => {
                            degradation.adjust_operation(&transition.dependency);
                        }
                        Ok(_) => {}
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "Breaker watcher lagged behind transition events");
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            }
            debug!("Breaker watcher stopped");
        })
    }

    pub fn degradation_level_evidence(&self) -> EvidenceCollector {
        evidence::degradation_level(self.degradation.clone())
    }

    pub fn unhealthy_breakers_evidence(&self) -> EvidenceCollector {
        evidence::unhealthy_breakers(self.breakers.clone())
    }

    pub fn breaker_failure_rate_evidence(&self, dependency: &str) -> EvidenceCollector {
        evidence::breaker_failure_rate(self.breakers.clone(), dependency)
    }

    pub fn latest_psi_evidence(&self, feature: &str) -> EvidenceCollector {
        evidence::latest_psi(self.drift.clone(), feature)
    }

    pub fn latest_mean_evidence(&self, feature: &str) -> EvidenceCollector {
        evidence::latest_mean(self.drift.clone(), feature)
    }
}
