//! # Resilience
//!
//! Protection for calls to flaky upstream services (CRM, email outreach,
//! enrichment, scraping):
//!
//! - [`retry`]: exponential backoff with jitter and cancellation
//! - [`circuit_breaker`]: per-dependency CLOSED → OPEN → HALF_OPEN state machine
//! - [`registry`]: named breakers composed as `CircuitBreaker(Retry(call))`
//!
//! ```text
//! caller ──► CircuitBreakerRegistry::call_with_retry("clay_api", ..)
//!              └── CircuitBreaker (admission, outcome recording, transitions)
//!                    └── execute_with_retry (backoff between attempts)
//!                          └── operation() -> Result<T, OperationError>
//! ```

pub mod circuit_breaker;
pub mod config;
pub mod error;
pub mod metrics;
pub mod registry;
pub mod retry;

pub use circuit_breaker::{CallPermit, CircuitBreaker, CircuitState, CircuitTransition};
pub use config::{CircuitBreakerConfig, RetryPolicy};
pub use error::{OperationError, ResilienceError};
pub use metrics::CircuitBreakerMetrics;
pub use registry::CircuitBreakerRegistry;
pub use retry::{execute_with_retry, RetryStrategy};
