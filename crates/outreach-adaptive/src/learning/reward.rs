//! Reward function over campaign outcomes.

use serde::{Deserialize, Serialize};

// Per-event weights; negative events are penalties.
pub const REWARD_OPEN: f64 = 1.0;
pub const REWARD_CLICK: f64 = 3.0;
pub const REWARD_REPLY: f64 = 10.0;
pub const REWARD_POSITIVE_REPLY: f64 = 20.0;
pub const REWARD_MEETING_BOOKED: f64 = 50.0;
pub const REWARD_DEAL_CLOSED: f64 = 100.0;
pub const REWARD_UNSUBSCRIBE: f64 = -10.0;
pub const REWARD_SPAM_REPORT: f64 = -50.0;
pub const REWARD_BOUNCE: f64 = -5.0;

/// Observed engagement for one campaign touch. Missing fields deserialize as 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CampaignOutcome {
    pub opens: u32,
    pub clicks: u32,
    pub replies: u32,
    pub positive_replies: u32,
    pub meetings_booked: u32,
    pub deals_closed: u32,
    pub unsubscribes: u32,
    pub spam_reports: u32,
    pub bounces: u32,
}

/// Weighted sum of event counts
pub fn calculate_reward(outcome: &CampaignOutcome) -> f64 {
    [
        (outcome.opens, REWARD_OPEN),
        (outcome.clicks, REWARD_CLICK),
        (outcome.replies, REWARD_REPLY),
        (outcome.positive_replies, REWARD_POSITIVE_REPLY),
        (outcome.meetings_booked, REWARD_MEETING_BOOKED),
        (outcome.deals_closed, REWARD_DEAL_CLOSED),
        (outcome.unsubscribes, REWARD_UNSUBSCRIBE),
        (outcome.spam_reports, REWARD_SPAM_REPORT),
        (outcome.bounces, REWARD_BOUNCE),
    ]
    .iter()
    .map(|(count, weight)| f64::from(*count) * weight)
    .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reward_weights() {
        let outcome = CampaignOutcome {
            opens: 3,
            clicks: 1,
            replies: 1,
            positive_replies: 1,
            meetings_booked: 1,
            ..Default::default()
        };
        assert_eq!(calculate_reward(&outcome), 3.0 + 3.0 + 10.0 + 20.0 + 50.0);

        let bad = CampaignOutcome {
            bounces: 2,
            spam_reports: 1,
            unsubscribes: 1,
            ..Default::default()
        };
        assert_eq!(calculate_reward(&bad), -10.0 - 50.0 - 10.0);
        assert_eq!(calculate_reward(&CampaignOutcome::default()), 0.0);
    }

    #[test]
    fn test_reward_is_bit_identical_across_calls() {
        let outcome = CampaignOutcome {
            opens: 17,
            clicks: 4,
            deals_closed: 1,
            bounces: 3,
            ..Default::default()
        };
        assert_eq!(
            calculate_reward(&outcome).to_bits(),
            calculate_reward(&outcome).to_bits()
        );
    }

    #[test]
    fn test_reward_handles_extreme_counts() {
        let outcome = CampaignOutcome {
            spam_reports: u32::MAX,
            deals_closed: u32::MAX,
            ..Default::default()
        };
        assert!(calculate_reward(&outcome).is_finite());
    }

    #[test]
    fn test_missing_fields_default_to_zero() {
        let outcome: CampaignOutcome = serde_json::from_str(r#"{"replies": 2}"#).unwrap();
        assert_eq!(outcome.replies, 2);
        assert_eq!(outcome.opens, 0);
        assert_eq!(calculate_reward(&outcome), 20.0);
    }
}
