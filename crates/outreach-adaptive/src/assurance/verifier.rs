//! # Dynamic Assurance Verifier
//!
//! Periodically re-checks registered claims against live evidence. A violation
//! appends an [`AlertRecord`] and runs the case's action; a failing or panicking collector
//! marks only its own case as `error`.
//!
//! Collectors and actions run without any verifier lock held, so evidence
//! sources may read the verifier itself.

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use outreach_shared::degradation::{DegradationController, DegradationLevel};

use super::action::{BuiltinAction, ViolationAction};
use super::case::{
    AlertRecord, AssuranceCase, AssuranceCaseDefinition, CaseSnapshot, CaseStatus, Severity,
};
use super::notifier::Notifier;
use super::AssuranceError;

/// Outcome of one verification pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationRun {
    /// Pass/fail per case checked in this pass
    pub results: BTreeMap<String, bool>,
    /// False when the pass was cancelled before every case was checked
    pub completed: bool,
}

enum Evaluation {
    Passed(f64),
    Violated(AlertRecord),
    Errored(String),
}

#[derive(Debug)]
pub struct AssuranceVerifier {
    cases: RwLock<Vec<AssuranceCase>>,
    alerts: Mutex<Vec<AlertRecord>>,
    degradation: Arc<DegradationController>,
    notifier: Arc<dyn Notifier>,
}

impl AssuranceVerifier {
    pub fn new(degradation: Arc<DegradationController>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            cases: RwLock::new(Vec::new()),
            alerts: Mutex::new(Vec::new()),
            degradation,
            notifier,
        }
    }

    /// Register a case. Redefining a name replaces it in place and resets its status.
    pub fn define_assurance_case(
        &self,
        definition: AssuranceCaseDefinition,
    ) -> Result<(), AssuranceError> {
        definition.validate()?;

        let mut cases = self.cases.write().unwrap_or_else(|p| p.into_inner());
        let name = definition.name.clone();
        match cases.iter_mut().find(|case| case.definition.name == name) {
            Some(existing) => {
                warn!(case = %name, "Assurance case redefined, replacing previous definition");
                *existing = AssuranceCase::new(definition);
            }
            None => {
                debug!(
                    case = %name,
                    action = %definition.action_on_violation.label(),
                    "Assurance case defined"
                );
                cases.push(AssuranceCase::new(definition));
            }
        }
        Ok(())
    }

    /// Case names in registration order
    pub fn case_names(&self) -> Vec<String> {
        self.cases
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .map(|case| case.definition.name.clone())
            .collect()
    }

    pub fn case_snapshots(&self) -> Vec<CaseSnapshot> {
        self.cases
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .map(AssuranceCase::snapshot)
            .collect()
    }

    pub fn case_snapshot(&self, name: &str) -> Option<CaseSnapshot> {
        self.cases
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .find(|case| case.definition.name == name)
            .map(AssuranceCase::snapshot)
    }

    pub fn alerts(&self) -> Vec<AlertRecord> {
        self.alerts.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn alert_count(&self) -> usize {
        self.alerts.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    /// Verify every case in registration order
    pub fn verify_all(&self) -> BTreeMap<String, bool> {
        self.verify_until(&CancellationToken::new()).results
    }

    /// Verify cases in registration order until `cancel` fires.
    ///
    /// Results for cases checked before cancellation are kept.
    pub fn verify_until(&self, cancel: &CancellationToken) -> VerificationRun {
        let definitions: Vec<AssuranceCaseDefinition> = self
            .cases
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .map(|case| case.definition.clone())
            .collect();

        let mut run = VerificationRun {
            results: BTreeMap::new(),
            completed: true,
        };

        for definition in &definitions {
            if cancel.is_cancelled() {
                info!(
                    checked = run.results.len(),
                    total = definitions.len(),
                    "Assurance verification cancelled"
                );
                run.completed = false;
                break;
            }
            let passed = self.verify_definition(definition);
            run.results.insert(definition.name.clone(), passed);
        }

        run
    }

    /// Verify a single case by name
    pub fn verify_case(&self, name: &str) -> Option<bool> {
        let definition = self
            .cases
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .find(|case| case.definition.name == name)
            .map(|case| case.definition.clone())?;
        Some(self.verify_definition(&definition))
    }

    /// Run `verify_until` every `interval` until `cancel` fires
    pub fn spawn_periodic(
        self: Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let run = self.verify_until(&cancel);
                        let failed = run.results.values().filter(|passed| !**passed).count();
                        debug!(
                            checked = run.results.len(),
                            failed,
                            completed = run.completed,
                            "Periodic assurance verification finished"
                        );
                    }
                }
            }
            debug!("Periodic assurance verification stopped");
        })
    }

    fn verify_definition(&self, definition: &AssuranceCaseDefinition) -> bool {
        let collected = panic::catch_unwind(AssertUnwindSafe(|| {
            definition.evidence_collector.collect()
        }));
        let evaluation = match collected {
            Err(payload) => Evaluation::Errored(panic_message(payload.as_ref())),
            Ok(Ok(evidence)) if !evidence.is_finite() => {
                Evaluation::Errored(format!("collector returned non-finite evidence {evidence}"))
            }
            Ok(Ok(evidence)) if definition.within_thresholds(evidence) => {
                Evaluation::Passed(evidence)
            }
            Ok(Ok(evidence)) => Evaluation::Violated(AlertRecord {
                case_name: definition.name.clone(),
                claim: definition.claim.clone(),
                evidence,
                threshold_min: definition.threshold_min,
                threshold_max: definition.threshold_max,
                severity: definition.severity,
                timestamp: Utc::now(),
            }),
            Ok(Err(e)) => Evaluation::Errored(e.to_string()),
        };

        let (status, evidence, last_error, passed) = match &evaluation {
            Evaluation::Passed(evidence) => (CaseStatus::Passed, Some(*evidence), None, true),
            Evaluation::Violated(alert) => (CaseStatus::Failed, Some(alert.evidence), None, false),
            Evaluation::Errored(message) => {
                error!(case = %definition.name, error = %message, "Evidence collection failed");
                (CaseStatus::Error, None, Some(message.clone()), false)
            }
        };
        self.record_status(&definition.name, status, evidence, last_error);

        if let Evaluation::Violated(alert) = evaluation {
            log_violation(&alert, &definition.action_on_violation);
            self.alerts
                .lock()
                .unwrap_or_else(|p| p.into_inner())
                .push(alert.clone());
            self.execute_action(&definition.action_on_violation, &alert);
        }

        passed
    }

    fn record_status(
        &self,
        name: &str,
        status: CaseStatus,
        evidence: Option<f64>,
        last_error: Option<String>,
    ) {
        let mut cases = self.cases.write().unwrap_or_else(|p| p.into_inner());
        // A concurrent redefinition may have removed the name; nothing to record then
        if let Some(case) = cases.iter_mut().find(|case| case.definition.name == name) {
            case.status = status;
            case.last_verified = Some(Utc::now());
            if evidence.is_some() {
                case.last_evidence = evidence;
            }
            case.last_error = last_error;
        }
    }

    fn execute_action(&self, action: &ViolationAction, alert: &AlertRecord) {
        match action {
            ViolationAction::Builtin(BuiltinAction::PauseOperations) => {
                self.degradation
                    .escalate_to(DegradationLevel::Maintenance, &alert.case_name);
            }
            ViolationAction::Builtin(BuiltinAction::ReduceThroughput) => {
                self.degradation
                    .escalate_to(DegradationLevel::Limited, &alert.case_name);
            }
            ViolationAction::Builtin(BuiltinAction::NotifyTeam) => self.notifier.notify(alert),
            ViolationAction::Callback(callback) => callback.call(alert),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned());
    match detail {
        Some(detail) => format!("evidence collector panicked: {detail}"),
        None => "evidence collector panicked".to_string(),
    }
}

fn log_violation(alert: &AlertRecord, action: &ViolationAction) {
    match alert.severity {
        Severity::High | Severity::Critical => error!(
            case = %alert.case_name,
            evidence = alert.evidence,
            threshold_min = ?alert.threshold_min,
            threshold_max = ?alert.threshold_max,
            action = %action.label(),
            "Assurance case violated"
        ),
        Severity::Low | Severity::Medium => warn!(
            case = %alert.case_name,
            evidence = alert.evidence,
            threshold_min = ?alert.threshold_min,
            threshold_max = ?alert.threshold_max,
            action = %action.label(),
            "Assurance case violated"
        ),
    }
}
