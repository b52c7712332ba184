//! # Outreach Core
//!
//! Resilience and adaptive decision layer for outbound campaign automation.
//!
//! External calls run through `CircuitBreaker(Retry(call))`; failures raise the
//! global degradation level. Campaign outcomes train a tabular Q-learner that
//! picks the next template, timing and personalization depth. Feature drift
//! and periodically re-verified assurance cases supervise both and feed back
//! into degradation.
//!
//! This crate re-exports the workspace members:
//!
//! - [`shared`]: configuration, logging, errors, resilience, degradation
//! - [`adaptive`]: learning, drift detection, assurance, control plane wiring
//!
//! ```no_run
//! use outreach_core::adaptive::learning::{ActionSpace, PersonalizationDepth};
//! use outreach_core::adaptive::ControlPlane;
//! use outreach_core::shared::config::ConfigManager;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigManager::load()?.into_config();
//! let actions = ActionSpace::cartesian(
//!     &["pain_point", "case_study"],
//!     &["immediate", "delay_2d"],
//!     &[PersonalizationDepth::Light, PersonalizationDepth::Deep],
//! )?;
//! let plane = ControlPlane::new(config, actions)?;
//! plane.start();
//! // ... route calls through plane.breakers(), pick actions with plane.learning()
//! plane.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub use outreach_adaptive as adaptive;
pub use outreach_shared as shared;

pub use outreach_adaptive::ControlPlane;
pub use outreach_shared::{OutreachError, OutreachResult};
