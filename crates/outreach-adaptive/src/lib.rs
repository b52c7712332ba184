//! # Outreach Adaptive
//!
//! The adaptive half of the outreach control plane:
//!
//! - [`learning`]: tabular Q-learning over campaign decisions
//! - [`drift`]: baseline distributions and drift checks
//! - [`assurance`]: periodically re-verified operational claims
//! - [`control_plane`]: wiring between these and the resilience layer in
//!   `outreach-shared`

pub mod assurance;
pub mod control_plane;
pub mod drift;
pub mod evidence;
pub mod learning;

pub use control_plane::{ControlPlane, FEATURE_DRIFT_COMPONENT};
