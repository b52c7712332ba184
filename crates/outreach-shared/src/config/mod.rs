//! # Control Plane Configuration
//!
//! Canonical configuration types for every component of the control plane.
//! Each section deserializes from TOML with per-field defaults, so a config file
//! only needs to name the values it overrides.
//!
//! Runtime types (durations, policies) are produced by the adapters in
//! [`circuit_breaker`] rather than stored here.

pub mod circuit_breaker;
pub mod loader;

pub use loader::{ConfigManager, CONFIG_PATH_ENV};

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Configuration path not set: export {0}")]
    MissingPath(String),

    #[error("Failed to load configuration from '{path}': {reason}")]
    Load { path: String, reason: String },

    #[error("Invalid configuration value for '{field}': {reason}")]
    Validation { field: String, reason: String },
}

impl ConfigurationError {
    /// Create a validation error for a named field
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a load error for a path
    pub fn load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Load {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Root configuration for the control plane
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlPlaneConfig {
    pub retry: RetrySettings,
    pub circuit_breakers: CircuitBreakerConfig,
    pub degradation: DegradationSettings,
    pub learning: LearningSettings,
    pub drift: DriftSettings,
    pub assurance: AssuranceSettings,
}

impl ControlPlaneConfig {
    /// Validate cross-field constraints for every section
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.retry.validate()?;
        self.circuit_breakers.validate()?;
        self.degradation.validate()?;
        self.learning.validate()?;
        self.drift.validate()?;
        self.assurance.validate()?;
        Ok(())
    }
}

/// Retry with exponential backoff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub exponential_base: f64,
    /// Symmetric jitter as a fraction of the computed delay
    pub jitter_ratio: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 60_000,
            exponential_base: 2.0,
            jitter_ratio: 0.25,
        }
    }
}

impl RetrySettings {
    fn validate(&self) -> Result<(), ConfigurationError> {
        if self.exponential_base < 1.0 {
            return Err(ConfigurationError::validation(
                "retry.exponential_base",
                "must be >= 1.0",
            ));
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err(ConfigurationError::validation(
                "retry.max_delay_ms",
                "must be >= retry.base_delay_ms",
            ));
        }
        if !(0.0..1.0).contains(&self.jitter_ratio) {
            return Err(ConfigurationError::validation(
                "retry.jitter_ratio",
                "must be in [0.0, 1.0)",
            ));
        }
        Ok(())
    }
}

/// Per-component circuit breaker thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerComponentConfig {
    pub failure_threshold: u32,
    pub recovery_timeout_seconds: u64,
    pub success_threshold: u32,
}

impl Default for CircuitBreakerComponentConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout_seconds: 60,
            success_threshold: 1,
        }
    }
}

/// Circuit breaker defaults plus overrides keyed by dependency name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    pub default_config: CircuitBreakerComponentConfig,
    pub component_configs: HashMap<String, CircuitBreakerComponentConfig>,
}

impl CircuitBreakerConfig {
    /// Config for a dependency, falling back to the default
    pub fn config_for_component(&self, name: &str) -> &CircuitBreakerComponentConfig {
        self.component_configs
            .get(name)
            .unwrap_or(&self.default_config)
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        let all = std::iter::once(("default_config", &self.default_config)).chain(
            self.component_configs
                .iter()
                .map(|(name, config)| (name.as_str(), config)),
        );
        for (name, config) in all {
            if config.failure_threshold == 0 {
                return Err(ConfigurationError::validation(
                    format!("circuit_breakers.{name}.failure_threshold"),
                    "must be > 0",
                ));
            }
            if config.success_threshold == 0 {
                return Err(ConfigurationError::validation(
                    format!("circuit_breakers.{name}.success_threshold"),
                    "must be > 0",
                ));
            }
        }
        Ok(())
    }
}

/// Graceful degradation overrides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DegradationSettings {
    /// Component name to minimum degradation level (0-4), merged over the built-in table
    pub component_levels: HashMap<String, u8>,
    /// Consecutive healthy checks required before the level resets to 0
    pub recovery_streak: u32,
}

impl Default for DegradationSettings {
    fn default() -> Self {
        Self {
            component_levels: HashMap::new(),
            recovery_streak: 5,
        }
    }
}

impl DegradationSettings {
    fn validate(&self) -> Result<(), ConfigurationError> {
        if let Some((name, level)) = self.component_levels.iter().find(|(_, level)| **level > 4) {
            return Err(ConfigurationError::validation(
                format!("degradation.component_levels.{name}"),
                format!("level {level} outside 0..=4"),
            ));
        }
        if self.recovery_streak == 0 {
            return Err(ConfigurationError::validation(
                "degradation.recovery_streak",
                "must be > 0",
            ));
        }
        Ok(())
    }
}

/// Tabular Q-learning parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningSettings {
    pub learning_rate: f64,
    pub discount_factor: f64,
    pub epsilon: f64,
    /// Multiplicative decay applied per finished episode (1.0 disables decay)
    pub epsilon_decay: f64,
    pub min_epsilon: f64,
    /// Action key returned for states that have never been updated
    pub fallback_action: Option<String>,
    /// Seed for the exploration RNG; unset means entropy-seeded
    pub seed: Option<u64>,
    pub audit_log: bool,
    pub policy_path: Option<String>,
}

impl Default for LearningSettings {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            discount_factor: 0.95,
            epsilon: 0.1,
            epsilon_decay: 1.0,
            min_epsilon: 0.01,
            fallback_action: None,
            seed: None,
            audit_log: false,
            policy_path: None,
        }
    }
}

impl LearningSettings {
    fn validate(&self) -> Result<(), ConfigurationError> {
        let unit = [
            ("learning.learning_rate", self.learning_rate),
            ("learning.discount_factor", self.discount_factor),
            ("learning.epsilon", self.epsilon),
            ("learning.epsilon_decay", self.epsilon_decay),
            ("learning.min_epsilon", self.min_epsilon),
        ];
        for (field, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigurationError::validation(field, "must be in [0.0, 1.0]"));
            }
        }
        Ok(())
    }
}

/// Drift detection thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftSettings {
    pub histogram_bins: usize,
    pub mean_shift_threshold: f64,
    pub variance_ratio_min: f64,
    pub variance_ratio_max: f64,
    pub psi_threshold: f64,
    pub psi_high_threshold: f64,
    /// Escalate degradation through the `feature_drift` component on detected drift
    pub escalate_on_drift: bool,
}

impl Default for DriftSettings {
    fn default() -> Self {
        Self {
            histogram_bins: 10,
            mean_shift_threshold: 2.0,
            variance_ratio_min: 0.5,
            variance_ratio_max: 2.0,
            psi_threshold: 0.2,
            psi_high_threshold: 0.25,
            escalate_on_drift: true,
        }
    }
}

impl DriftSettings {
    fn validate(&self) -> Result<(), ConfigurationError> {
        if self.histogram_bins == 0 {
            return Err(ConfigurationError::validation(
                "drift.histogram_bins",
                "must be > 0",
            ));
        }
        if self.variance_ratio_min >= self.variance_ratio_max {
            return Err(ConfigurationError::validation(
                "drift.variance_ratio_min",
                "must be < drift.variance_ratio_max",
            ));
        }
        if self.psi_high_threshold < self.psi_threshold {
            return Err(ConfigurationError::validation(
                "drift.psi_high_threshold",
                "must be >= drift.psi_threshold",
            ));
        }
        Ok(())
    }
}

/// Assurance verification cadence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssuranceSettings {
    pub verification_interval_seconds: u64,
}

impl Default for AssuranceSettings {
    fn default() -> Self {
        Self {
            verification_interval_seconds: 300,
        }
    }
}

impl AssuranceSettings {
    fn validate(&self) -> Result<(), ConfigurationError> {
        if self.verification_interval_seconds == 0 {
            return Err(ConfigurationError::validation(
                "assurance.verification_interval_seconds",
                "must be > 0",
            ));
        }
        Ok(())
    }
}
