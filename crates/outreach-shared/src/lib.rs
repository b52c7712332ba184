//! # Outreach Shared
//!
//! Shared building blocks for the outreach control plane:
//!
//! - [`config`]: canonical TOML configuration and the [`config::ConfigManager`] loader
//! - [`resilience`]: retry with backoff, circuit breakers and the breaker registry
//! - [`degradation`]: the process-wide graceful degradation controller
//! - [`logging`]: tracing subscriber initialization
//! - [`errors`]: the umbrella [`OutreachError`] type
//!
//! Everything here is independent of the adaptive layer (`outreach-adaptive`),
//! which consumes these types as evidence sources and escalation targets.

pub mod config;
pub mod degradation;
pub mod errors;
pub mod logging;
pub mod resilience;

pub use errors::{OutreachError, OutreachResult};
