//! # Circuit Breaker
//!
//! Per-dependency circuit breaker guarding calls to an external service.
//!
//! ## States
//!
//! - **Closed**: normal operation, calls pass through. A success resets the
//!   consecutive failure count; reaching `failure_threshold` failures opens the circuit.
//! - **Open**: calls fail fast with [`ResilienceError::CircuitOpen`] until
//!   `recovery_timeout` has elapsed since the last failure.
//! - **Half-Open**: one trial call at a time is let through. A trial success
//!   (`success_threshold` of them) closes the circuit; a trial failure reopens it.
//!
//! All state lives behind one mutex, so transitions are linearizable per
//! dependency and outcomes are applied in the order calls complete.
//! Every transition is logged and, when a sender is attached, broadcast as a
//! [`CircuitTransition`].

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::resilience::{CircuitBreakerConfig, CircuitBreakerMetrics, ResilienceError};

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    #[display("closed")]
    Closed,
    #[display("open")]
    Open,
    #[display("half_open")]
    HalfOpen,
}

/// State-transition event emitted by a breaker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitTransition {
    pub dependency: String,
    pub from: CircuitState,
    pub to: CircuitState,
    pub consecutive_failures: u32,
    pub at: DateTime<Utc>,
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    failure_count: u32,
    last_failure_at: Option<Instant>,
    half_open_successes: u32,
    trial_in_flight: bool,
}

#[derive(Debug, Default)]
struct BreakerCounters {
    total_calls: AtomicU64,
    success_count: AtomicU64,
    failure_count: AtomicU64,
    rejected_calls: AtomicU64,
    state_transitions: AtomicU64,
    total_duration_nanos: AtomicU64,
}

/// Circuit breaker for one named dependency
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    state: Mutex<BreakerState>,
    counters: BreakerCounters,
    transitions: Option<broadcast::Sender<CircuitTransition>>,
}

/// Admission ticket returned by [`CircuitBreaker::try_acquire`].
///
/// A half-open trial permit that is dropped without being settled (for
/// example because the calling future was cancelled) frees the trial slot
/// without recording a failure.
#[derive(Debug)]
pub struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    trial: bool,
    settled: bool,
}

impl CallPermit<'_> {
    /// Whether this permit is the half-open trial call
    pub fn is_trial(&self) -> bool {
        self.trial
    }

    /// Record a successful call
    pub fn succeed(mut self, duration: Duration) {
        self.settled = true;
        self.breaker.record_success(duration);
    }

    /// Record a failed call
    pub fn fail(mut self, duration: Duration) {
        self.settled = true;
        self.breaker.record_failure(duration);
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if self.trial && !self.settled {
            self.breaker.release_trial();
        }
    }
}

impl CircuitBreaker {
    /// Create a new breaker in the closed state
    pub fn new(name: String, config: CircuitBreakerConfig) -> Self {
        Self {
            name,
            config,
            state: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                failure_count: 0,
                last_failure_at: None,
                half_open_successes: 0,
                trial_in_flight: false,
            }),
            counters: BreakerCounters::default(),
            transitions: None,
        }
    }

    /// Broadcast state transitions on the given channel
    pub fn with_transition_sender(mut self, sender: broadcast::Sender<CircuitTransition>) -> Self {
        self.transitions = Some(sender);
        self
    }

    /// Name of the dependency this breaker protects
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Current circuit state (does not perform the open → half-open check)
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Current consecutive failure count
    pub fn failure_count(&self) -> u32 {
        self.lock().failure_count
    }

    /// Closed breakers are healthy
    pub fn is_healthy(&self) -> bool {
        self.state() == CircuitState::Closed
    }

    /// Ask for admission of one call.
    ///
    /// Moves an open circuit to half-open once the recovery timeout has elapsed
    /// since the last failure; the caller receiving that permit is the trial call.
    pub fn try_acquire(&self) -> Result<CallPermit<'_>, ResilienceError> {
        let mut guard = self.lock();
        let current = guard.state;
        let admitted_as_trial = match current {
            CircuitState::Closed => Some(false),
            CircuitState::Open => {
                let recovered = guard.last_failure_at.map_or(true, |at| {
                    Instant::now().saturating_duration_since(at) >= self.config.recovery_timeout
                });
                if recovered {
                    self.transition(&mut guard, CircuitState::HalfOpen);
                    guard.trial_in_flight = true;
                    Some(true)
                } else {
                    None
                }
            }
            CircuitState::HalfOpen if !guard.trial_in_flight => {
                guard.trial_in_flight = true;
                Some(true)
            }
            CircuitState::HalfOpen => None,
        };
        drop(guard);

        match admitted_as_trial {
            Some(trial) => {
                self.counters.total_calls.fetch_add(1, Ordering::Relaxed);
                Ok(CallPermit {
                    breaker: self,
                    trial,
                    settled: false,
                })
            }
            None => {
                self.counters.rejected_calls.fetch_add(1, Ordering::Relaxed);
                debug!(dependency = %self.name, "Call rejected - circuit breaker open");
                Err(ResilienceError::circuit_open(&self.name))
            }
        }
    }

    /// Execute an async operation under breaker protection.
    ///
    /// Returns [`ResilienceError::CircuitOpen`] without invoking `operation` when
    /// the circuit is open. Otherwise the operation's own error is returned and
    /// recorded as a failure (cancellation excepted).
    pub async fn call<T, E, F, Fut>(&self, operation: F) -> Result<T, ResilienceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<ResilienceError>,
    {
        let permit = self.try_acquire()?;
        let start = Instant::now();
        let result = operation().await.map_err(Into::into);

        match &result {
            Ok(_) => permit.succeed(start.elapsed()),
            Err(e) if e.counts_as_failure() => permit.fail(start.elapsed()),
            Err(_) => drop(permit),
        }
        result
    }

    /// Record a successful operation.
    ///
    /// Closed: resets the failure count. Half-open: counts toward
    /// `success_threshold` and closes the circuit once reached.
    pub fn record_success(&self, duration: Duration) {
        self.counters.success_count.fetch_add(1, Ordering::Relaxed);
        self.add_duration(duration);

        let mut guard = self.lock();
        let current = guard.state;
        match current {
            CircuitState::Closed => guard.failure_count = 0,
            CircuitState::HalfOpen => {
                guard.trial_in_flight = false;
                guard.half_open_successes += 1;
                if guard.half_open_successes >= self.config.success_threshold {
                    guard.failure_count = 0;
                    guard.half_open_successes = 0;
                    self.transition(&mut guard, CircuitState::Closed);
                }
            }
            // A call admitted before the circuit tripped completed late
            CircuitState::Open => {}
        }
    }

    /// Record a failed operation.
    ///
    /// Closed: opens the circuit once `failure_threshold` is reached.
    /// Half-open: any failure reopens the circuit immediately.
    pub fn record_failure(&self, duration: Duration) {
        self.counters.failure_count.fetch_add(1, Ordering::Relaxed);
        self.add_duration(duration);

        let mut guard = self.lock();
        guard.failure_count = guard.failure_count.saturating_add(1);
        guard.last_failure_at = Some(Instant::now());

        let current = guard.state;
        match current {
            CircuitState::Closed if guard.failure_count >= self.config.failure_threshold => {
                self.transition(&mut guard, CircuitState::Open);
            }
            CircuitState::HalfOpen => {
                guard.trial_in_flight = false;
                guard.half_open_successes = 0;
                self.transition(&mut guard, CircuitState::Open);
            }
            CircuitState::Closed | CircuitState::Open => {}
        }
    }

    /// Force the circuit to open state (emergency kill switch)
    pub fn force_open(&self) {
        let mut guard = self.lock();
        guard.last_failure_at = Some(Instant::now());
        guard.trial_in_flight = false;
        if guard.state != CircuitState::Open {
            self.transition(&mut guard, CircuitState::Open);
        }
    }

    /// Force the circuit to closed state (emergency recovery)
    pub fn force_closed(&self) {
        let mut guard = self.lock();
        guard.failure_count = 0;
        guard.half_open_successes = 0;
        guard.trial_in_flight = false;
        if guard.state != CircuitState::Closed {
            self.transition(&mut guard, CircuitState::Closed);
        }
    }

    /// Get a metrics snapshot for observability
    pub fn metrics(&self) -> CircuitBreakerMetrics {
        let (state, consecutive_failures, half_open_successes) = {
            let guard = self.lock();
            (guard.state, guard.failure_count, guard.half_open_successes)
        };

        CircuitBreakerMetrics {
            total_calls: self.counters.total_calls.load(Ordering::Relaxed),
            success_count: self.counters.success_count.load(Ordering::Relaxed),
            failure_count: self.counters.failure_count.load(Ordering::Relaxed),
            rejected_calls: self.counters.rejected_calls.load(Ordering::Relaxed),
            consecutive_failures: u64::from(consecutive_failures),
            half_open_successes: u64::from(half_open_successes),
            state_transitions: self.counters.state_transitions.load(Ordering::Relaxed),
            total_duration: Duration::from_nanos(
                self.counters.total_duration_nanos.load(Ordering::Relaxed),
            ),
            current_state: state,
            ..CircuitBreakerMetrics::new()
        }
        .with_derived_rates()
    }

    fn release_trial(&self) {
        self.lock().trial_in_flight = false;
    }

    fn add_duration(&self, duration: Duration) {
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        self.counters
            .total_duration_nanos
            .fetch_add(nanos, Ordering::Relaxed);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Apply a transition while holding the state lock so events for one
    /// dependency are emitted in the order they happened.
    fn transition(&self, guard: &mut BreakerState, to: CircuitState) {
        let from = guard.state;
        if from == to {
            return;
        }
        guard.state = to;
        self.counters
            .state_transitions
            .fetch_add(1, Ordering::Relaxed);

        info!(
            dependency = %self.name,
            from_state = %from,
            to_state = %to,
            consecutive_failures = guard.failure_count,
            "Circuit breaker state transition"
        );

        if let Some(sender) = &self.transitions {
            // No subscribers is not an error
            let _ = sender.send(CircuitTransition {
                dependency: self.name.clone(),
                from,
                to,
                consecutive_failures: guard.failure_count,
                at: Utc::now(),
            });
        }
    }
}
