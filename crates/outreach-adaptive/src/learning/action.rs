//! Campaign actions and the fixed action space.

use std::collections::HashSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::LearningError;
use super::state::StateKey;

/// Separator between action components
pub const ACTION_DELIMITER: char = ':';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum PersonalizationDepth {
    #[display("light")]
    Light,
    #[display("medium")]
    Medium,
    #[display("deep")]
    Deep,
}

impl FromStr for PersonalizationDepth {
    type Err = LearningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(PersonalizationDepth::Light),
            "medium" => Ok(PersonalizationDepth::Medium),
            "deep" => Ok(PersonalizationDepth::Deep),
            other => Err(LearningError::InvalidActionKey(other.to_string())),
        }
    }
}

/// Template × timing × personalization depth
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CampaignAction {
    pub template: String,
    pub timing: String,
    pub depth: PersonalizationDepth,
}

impl CampaignAction {
    pub fn new(
        template: impl Into<String>,
        timing: impl Into<String>,
        depth: PersonalizationDepth,
    ) -> Self {
        Self {
            template: template.into(),
            timing: timing.into(),
            depth,
        }
    }

    /// `template:timing:depth`
    pub fn key(&self) -> String {
        format!(
            "{}{ACTION_DELIMITER}{}{ACTION_DELIMITER}{}",
            self.template, self.timing, self.depth
        )
    }
}

impl FromStr for CampaignAction {
    type Err = LearningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(ACTION_DELIMITER);
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(template), Some(timing), Some(depth), None)
                if !template.is_empty() && !timing.is_empty() =>
            {
                let depth = depth
                    .parse()
                    .map_err(|_| LearningError::InvalidActionKey(s.to_string()))?;
                Ok(Self::new(template, timing, depth))
            }
            _ => Err(LearningError::InvalidActionKey(s.to_string())),
        }
    }
}

/// Fixed, ordered list of actions supplied once at construction.
///
/// Enumeration order is the tie-break order for greedy selection.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionSpace {
    actions: Vec<CampaignAction>,
    keys: Vec<String>,
}

impl ActionSpace {
    pub fn new(actions: Vec<CampaignAction>) -> Result<Self, LearningError> {
        if actions.is_empty() {
            return Err(LearningError::EmptyActionSpace);
        }
        let keys: Vec<String> = actions.iter().map(CampaignAction::key).collect();
        // Keys must split back into exactly three parts
        if let Some((_, key)) = actions.iter().zip(&keys).find(|(action, _)| {
            action.template.contains(ACTION_DELIMITER) || action.timing.contains(ACTION_DELIMITER)
        }) {
            return Err(LearningError::InvalidActionKey(key.clone()));
        }
        let mut seen = HashSet::new();
        if let Some(duplicate) = keys.iter().find(|key| !seen.insert(key.as_str())) {
            return Err(LearningError::DuplicateAction(duplicate.clone()));
        }
        Ok(Self { actions, keys })
    }

    /// Every combination, templates outermost
    pub fn cartesian(
        templates: &[&str],
        timings: &[&str],
        depths: &[PersonalizationDepth],
    ) -> Result<Self, LearningError> {
        let mut actions = Vec::with_capacity(templates.len() * timings.len() * depths.len());
        for template in templates {
            for timing in timings {
                for depth in depths {
                    actions.push(CampaignAction::new(*template, *timing, *depth));
                }
            }
        }
        Self::new(actions)
    }

    /// Actions available in `state`. Currently the full fixed list for every state.
    pub fn available(&self, _state: &StateKey) -> &[CampaignAction] {
        &self.actions
    }

    pub fn actions(&self) -> &[CampaignAction] {
        &self.actions
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn position(&self, key: &str) -> Option<usize> {
        self.keys.iter().position(|k| k == key)
    }

    pub fn get(&self, index: usize) -> Option<&CampaignAction> {
        self.actions.get(index)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
