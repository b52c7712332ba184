//! State encoding for the campaign learner.
//!
//! A state is the exact string join of discretized lead features. Two leads map
//! to the same state only if every bucket matches.

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// Separator between state components
pub const STATE_DELIMITER: char = '|';

/// Intent scores (0–100) below this are `low`
pub const INTENT_MEDIUM_THRESHOLD: f64 = 40.0;
/// Intent scores (0–100) at or above this are `high`
pub const INTENT_HIGH_THRESHOLD: f64 = 70.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum IntentBucket {
    #[display("low")]
    Low,
    #[display("medium")]
    Medium,
    #[display("high")]
    High,
}

impl IntentBucket {
    /// Bucket a 0–100 intent score; non-finite scores count as low intent
    pub fn from_score(score: f64) -> Self {
        if !score.is_finite() || score < INTENT_MEDIUM_THRESHOLD {
            IntentBucket::Low
        } else if score < INTENT_HIGH_THRESHOLD {
            IntentBucket::Medium
        } else {
            IntentBucket::High
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    /// 00:00–05:59
    #[display("night")]
    Night,
    /// 06:00–11:59
    #[display("morning")]
    Morning,
    /// 12:00–17:59
    #[display("afternoon")]
    Afternoon,
    /// 18:00–23:59
    #[display("evening")]
    Evening,
}

impl TimeOfDay {
    pub fn from_hour(hour: u32) -> Self {
        match hour % 24 {
            0..=5 => TimeOfDay::Night,
            6..=11 => TimeOfDay::Morning,
            12..=17 => TimeOfDay::Afternoon,
            _ => TimeOfDay::Evening,
        }
    }
}

/// Exact-match key into the Q-table
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(transparent)]
pub struct StateKey(String);

impl StateKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for StateKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for StateKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Discretized context of one lead at decision time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadContext {
    pub icp_tier: String,
    pub intent: IntentBucket,
    pub source: String,
    pub day_of_week: Weekday,
    pub time_of_day: TimeOfDay,
}

impl LeadContext {
    /// Context for a lead evaluated at `at`
    pub fn at(
        icp_tier: impl Into<String>,
        intent_score: f64,
        source: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            icp_tier: icp_tier.into(),
            intent: IntentBucket::from_score(intent_score),
            source: source.into(),
            day_of_week: at.weekday(),
            time_of_day: TimeOfDay::from_hour(at.hour()),
        }
    }

    /// `tier|intent|source|day|time`, lowercased
    pub fn state_key(&self) -> StateKey {
        let parts = [
            normalize_component(&self.icp_tier),
            self.intent.to_string(),
            normalize_component(&self.source),
            self.day_of_week.to_string().to_lowercase(),
            self.time_of_day.to_string(),
        ];
        StateKey(parts.join(&STATE_DELIMITER.to_string()))
    }
}

// Free-form components must not smuggle in the delimiter.
fn normalize_component(value: &str) -> String {
    value
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == STATE_DELIMITER || c.is_whitespace() { '_' } else { c })
        .collect()
}
