use std::fmt::Debug;

use tracing::{error, warn};

use super::case::{AlertRecord, Severity};

/// Destination for `notify_team` alerts
pub trait Notifier: Send + Sync + Debug {
    fn notify(&self, alert: &AlertRecord);
}

/// Emits alerts as tracing events
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, alert: &AlertRecord) {
        match alert.severity {
            Severity::High | Severity::Critical => error!(
                case = %alert.case_name,
                evidence = alert.evidence,
                severity = %alert.severity,
                claim = %alert.claim,
                "Assurance alert for team"
            ),
            Severity::Low | Severity::Medium => warn!(
                case = %alert.case_name,
                evidence = alert.evidence,
                severity = %alert.severity,
                claim = %alert.claim,
                "Assurance alert for team"
            ),
        }
    }
}
