//! Exploration schedules for epsilon-greedy selection.
//!
//! The engine asks its schedule for the next epsilon after each finished
//! episode, so decay policy is injected rather than hard-coded.

use std::fmt::Debug;

use outreach_shared::config::LearningSettings;

/// Produces the exploration rate over the life of the learner
pub trait ExplorationSchedule: Send + Sync + Debug {
    /// Epsilon before any episode has finished
    fn initial_epsilon(&self) -> f64;

    /// Epsilon to use after `episodes` finished episodes, given the current value
    fn next_epsilon(&self, current: f64, episodes: u64) -> f64;
}

/// Fixed epsilon
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantEpsilon(pub f64);

impl ExplorationSchedule for ConstantEpsilon {
    fn initial_epsilon(&self) -> f64 {
        self.0
    }

    fn next_epsilon(&self, _current: f64, _episodes: u64) -> f64 {
        self.0
    }
}

/// `epsilon * factor` per episode, never below `floor`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MultiplicativeDecay {
    pub initial: f64,
    pub factor: f64,
    pub floor: f64,
}

impl ExplorationSchedule for MultiplicativeDecay {
    fn initial_epsilon(&self) -> f64 {
        self.initial
    }

    fn next_epsilon(&self, current: f64, _episodes: u64) -> f64 {
        (current * self.factor).max(self.floor)
    }
}

/// Schedule described by the `[learning]` config section.
///
/// `epsilon_decay >= 1.0` means no decay.
pub fn schedule_from_settings(settings: &LearningSettings) -> Box<dyn ExplorationSchedule> {
    if settings.epsilon_decay >= 1.0 {
        Box::new(ConstantEpsilon(settings.epsilon))
    } else {
        Box::new(MultiplicativeDecay {
            initial: settings.epsilon,
            factor: settings.epsilon_decay,
            floor: settings.min_epsilon.min(settings.epsilon),
        })
    }
}
