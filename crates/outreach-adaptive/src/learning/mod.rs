//! # Campaign Learning
//!
//! Tabular Q-learning over discretized lead context. Actions are
//! template × timing × personalization depth; rewards come from observed
//! campaign outcomes.

pub mod action;
pub mod engine;
pub mod error;
pub mod exploration;
pub mod q_table;
pub mod reward;
pub mod state;

pub use action::{ActionSpace, CampaignAction, PersonalizationDepth};
pub use engine::{LearningEngine, PolicySnapshot, Transition};
pub use error::LearningError;
pub use exploration::{ConstantEpsilon, ExplorationSchedule, MultiplicativeDecay};
pub use q_table::QTable;
pub use reward::{calculate_reward, CampaignOutcome};
pub use state::{IntentBucket, LeadContext, StateKey, TimeOfDay};
