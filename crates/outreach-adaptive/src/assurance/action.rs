//! Actions executed when an assurance case is violated.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::case::AlertRecord;
use super::AssuranceError;

/// Well-known violation actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinAction {
    /// Escalate degradation to maintenance
    #[display("pause_operations")]
    PauseOperations,
    /// Hand the alert to the notifier
    #[display("notify_team")]
    NotifyTeam,
    /// Escalate degradation to limited throughput
    #[display("reduce_throughput")]
    ReduceThroughput,
}

impl FromStr for BuiltinAction {
    type Err = AssuranceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pause_operations" => Ok(BuiltinAction::PauseOperations),
            "notify_team" => Ok(BuiltinAction::NotifyTeam),
            "reduce_throughput" => Ok(BuiltinAction::ReduceThroughput),
            other => Err(AssuranceError::InvalidAction(other.to_string())),
        }
    }
}

/// Caller-supplied violation handler
#[derive(Clone)]
pub struct ViolationCallback(Arc<dyn Fn(&AlertRecord) + Send + Sync>);

impl ViolationCallback {
    pub fn call(&self, alert: &AlertRecord) {
        (self.0)(alert);
    }
}

impl fmt::Debug for ViolationCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ViolationCallback(..)")
    }
}

/// Built-in action or callback, validated when the case is defined
#[derive(Debug, Clone)]
pub enum ViolationAction {
    Builtin(BuiltinAction),
    Callback(ViolationCallback),
}

impl ViolationAction {
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(&AlertRecord) + Send + Sync + 'static,
    {
        Self::Callback(ViolationCallback(Arc::new(f)))
    }

    /// Name used in logs and snapshots
    pub fn label(&self) -> String {
        match self {
            ViolationAction::Builtin(action) => action.to_string(),
            ViolationAction::Callback(_) => "callback".to_string(),
        }
    }
}

impl From<BuiltinAction> for ViolationAction {
    fn from(action: BuiltinAction) -> Self {
        Self::Builtin(action)
    }
}

impl FromStr for ViolationAction {
    type Err = AssuranceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<BuiltinAction>().map(Self::Builtin)
    }
}
