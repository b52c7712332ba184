//! # Graceful Degradation
//!
//! Maps component failures to a global operating level (0–4) and exposes
//! which operations that level permits.

pub mod controller;
pub mod levels;

pub use controller::{DegradationController, DegradationError};
pub use levels::{
    ComponentLevelTable, DegradationLevel, Operation, DEFAULT_COMPONENT_LEVELS,
    UNKNOWN_COMPONENT_LEVEL,
};
