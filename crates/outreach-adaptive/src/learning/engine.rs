//! # Learning Engine
//!
//! Shared epsilon-greedy Q-learner for campaign decisions. Many workers select
//! actions while feedback ingestion applies updates, so the table sits behind a
//! single `RwLock`; exploration state (RNG, epsilon, episode accounting) sits
//! behind its own mutex and is never held across a table lock.

use std::io::Write;
use std::path::Path;
use std::sync::{Mutex, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use outreach_shared::config::LearningSettings;

use super::action::{ActionSpace, CampaignAction};
use super::error::LearningError;
use super::exploration::{schedule_from_settings, ExplorationSchedule};
use super::q_table::QTable;
use super::reward::{calculate_reward, CampaignOutcome};
use super::state::StateKey;

/// Persisted form of the learned policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicySnapshot {
    pub q_table: QTable,
    pub episode_rewards: Vec<f64>,
    pub saved_at: DateTime<Utc>,
}

/// One applied update, kept only when the audit log is enabled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub state: StateKey,
    pub action: String,
    pub reward: f64,
    pub next_state: StateKey,
    pub q_value: f64,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug)]
struct ExplorationState {
    rng: fastrand::Rng,
    epsilon: f64,
    episodes: u64,
    episode_reward: f64,
    episode_rewards: Vec<f64>,
    audit: Option<Vec<Transition>>,
}

/// Tabular Q-learning engine over a fixed [`ActionSpace`]
#[derive(Debug)]
pub struct LearningEngine {
    actions: ActionSpace,
    learning_rate: f64,
    discount_factor: f64,
    fallback: usize,
    schedule: Box<dyn ExplorationSchedule>,
    table: RwLock<QTable>,
    exploration: Mutex<ExplorationState>,
}

impl LearningEngine {
    pub fn new(actions: ActionSpace, settings: &LearningSettings) -> Result<Self, LearningError> {
        let fallback = match settings.fallback_action.as_deref() {
            Some(key) => {
                // Validate the key shape before checking membership
                let action: CampaignAction = key.parse()?;
                actions
                    .position(&action.key())
                    .ok_or_else(|| LearningError::UnknownAction(key.to_string()))?
            }
            None => 0,
        };

        let schedule = schedule_from_settings(settings);
        let rng = settings
            .seed
            .map_or_else(fastrand::Rng::new, fastrand::Rng::with_seed);

        Ok(Self {
            actions,
            learning_rate: settings.learning_rate,
            discount_factor: settings.discount_factor,
            fallback,
            exploration: Mutex::new(ExplorationState {
                rng,
                epsilon: schedule.initial_epsilon(),
                episodes: 0,
                episode_reward: 0.0,
                episode_rewards: Vec::new(),
                audit: settings.audit_log.then(Vec::new),
            }),
            schedule,
            table: RwLock::new(QTable::new()),
        })
    }

    /// Replace the exploration schedule; epsilon restarts from its initial value
    pub fn with_schedule(mut self, schedule: Box<dyn ExplorationSchedule>) -> Self {
        self.exploration
            .get_mut()
            .unwrap_or_else(|p| p.into_inner())
            .epsilon = schedule.initial_epsilon();
        self.schedule = schedule;
        self
    }

    pub fn action_space(&self) -> &ActionSpace {
        &self.actions
    }

    pub fn get_available_actions(&self, state: &StateKey) -> &[CampaignAction] {
        self.actions.available(state)
    }

    pub fn fallback_action(&self) -> &CampaignAction {
        &self.actions.actions()[self.fallback]
    }

    pub fn epsilon(&self) -> f64 {
        self.lock_exploration().epsilon
    }

    /// Epsilon-greedy choice for `state`
    pub fn select_action(&self, state: &StateKey) -> &CampaignAction {
        let available = self.get_available_actions(state);
        let explore = {
            let mut exploration = self.lock_exploration();
            let draw = exploration.rng.f64();
            (draw < exploration.epsilon).then(|| exploration.rng.usize(..available.len()))
        };

        match explore {
            Some(index) => {
                let action = &available[index];
                debug!(state = %state, action = %action.key(), "Exploring random action");
                action
            }
            None => self.greedy_action(state),
        }
    }

    /// Highest-valued action for `state` without exploration
    pub fn greedy_action(&self, state: &StateKey) -> &CampaignAction {
        let table = self.table.read().unwrap_or_else(|p| p.into_inner());
        match table.best_action(state.as_str(), self.actions.keys()) {
            Some(index) => &self.actions.actions()[index],
            None => self.fallback_action(),
        }
    }

    pub fn q_value(&self, state: &StateKey, action: &CampaignAction) -> f64 {
        self.table
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(state.as_str(), &action.key())
    }

    /// Apply one Q-learning update and return the new value.
    ///
    /// The reward also accumulates into the current episode total.
    pub fn update(
        &self,
        state: &StateKey,
        action: &CampaignAction,
        reward: f64,
        next_state: &StateKey,
    ) -> Result<f64, LearningError> {
        let action_key = action.key();
        if self.actions.position(&action_key).is_none() {
            return Err(LearningError::UnknownAction(action_key));
        }

        let q_value = self
            .table
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .update(
                state.as_str(),
                &action_key,
                reward,
                next_state.as_str(),
                self.learning_rate,
                self.discount_factor,
            );

        let mut exploration = self.lock_exploration();
        exploration.episode_reward += reward;
        if let Some(audit) = exploration.audit.as_mut() {
            audit.push(Transition {
                state: state.clone(),
                action: action_key,
                reward,
                next_state: next_state.clone(),
                q_value,
                recorded_at: Utc::now(),
            });
        }
        Ok(q_value)
    }

    /// Score `outcome` and apply it as an update. Returns the reward.
    pub fn record_outcome(
        &self,
        state: &StateKey,
        action: &CampaignAction,
        outcome: &CampaignOutcome,
        next_state: &StateKey,
    ) -> Result<f64, LearningError> {
        let reward = calculate_reward(outcome);
        self.update(state, action, reward, next_state)?;
        Ok(reward)
    }

    /// Close the current episode: record its total reward and advance epsilon.
    ///
    /// Returns the episode's total reward.
    pub fn end_episode(&self) -> f64 {
        let mut exploration = self.lock_exploration();
        let total = std::mem::take(&mut exploration.episode_reward);
        exploration.episode_rewards.push(total);
        exploration.episodes += 1;
        exploration.epsilon = self
            .schedule
            .next_epsilon(exploration.epsilon, exploration.episodes);
        total
    }

    pub fn episode_rewards(&self) -> Vec<f64> {
        self.lock_exploration().episode_rewards.clone()
    }

    /// Recorded transitions; empty unless the audit log is enabled
    pub fn audit_log(&self) -> Vec<Transition> {
        self.lock_exploration().audit.clone().unwrap_or_default()
    }

    pub fn snapshot(&self) -> PolicySnapshot {
        let q_table = self.table.read().unwrap_or_else(|p| p.into_inner()).clone();
        PolicySnapshot {
            q_table,
            episode_rewards: self.episode_rewards(),
            saved_at: Utc::now(),
        }
    }

    /// Write the Q-table and episode history as JSON.
    ///
    /// The snapshot goes to a temporary file in the target directory and is
    /// renamed over `path`, so readers never see a partial file.
    pub fn save_policy(&self, path: &Path) -> Result<(), LearningError> {
        let snapshot = self.snapshot();
        let json = serde_json::to_string_pretty(&snapshot)?;

        let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => {
                std::fs::create_dir_all(parent).map_err(|e| LearningError::io(parent, e))?;
                parent
            }
            None => Path::new("."),
        };
        let mut staged =
            tempfile::NamedTempFile::new_in(parent).map_err(|e| LearningError::io(parent, e))?;
        staged
            .write_all(json.as_bytes())
            .and_then(|()| staged.as_file().sync_all())
            .map_err(|e| LearningError::io(staged.path(), e))?;
        staged
            .persist(path)
            .map_err(|e| LearningError::io(path, e.error))?;

        info!(
            path = %path.display(),
            states = snapshot.q_table.state_count(),
            episodes = snapshot.episode_rewards.len(),
            "Policy saved"
        );
        Ok(())
    }

    /// Replace the table and history from a saved snapshot.
    ///
    /// A missing file leaves an empty table and returns `Ok(false)`.
    pub fn load_policy(&self, path: &Path) -> Result<bool, LearningError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No saved policy found, starting from an empty table");
                *self.table.write().unwrap_or_else(|p| p.into_inner()) = QTable::new();
                self.lock_exploration().episode_rewards.clear();
                return Ok(false);
            }
            Err(e) => return Err(LearningError::io(path, e)),
        };

        let snapshot: PolicySnapshot = serde_json::from_str(&contents)?;
        info!(
            path = %path.display(),
            states = snapshot.q_table.state_count(),
            saved_at = %snapshot.saved_at,
            "Policy loaded"
        );

        *self.table.write().unwrap_or_else(|p| p.into_inner()) = snapshot.q_table;
        self.lock_exploration().episode_rewards = snapshot.episode_rewards;
        Ok(true)
    }

    fn lock_exploration(&self) -> std::sync::MutexGuard<'_, ExplorationState> {
        self.exploration.lock().unwrap_or_else(|p| p.into_inner())
    }
}
