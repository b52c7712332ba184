//! # Circuit Breaker Registry
//!
//! Owns one [`CircuitBreaker`] per named dependency, created lazily from the
//! per-component configuration. All breakers share a broadcast channel so the
//! control plane can observe state transitions without polling.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::{Arc, RwLock};

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::config::CircuitBreakerConfig as CircuitBreakerSettings;
use crate::resilience::{
    execute_with_retry, CircuitBreaker, CircuitBreakerMetrics, CircuitState, CircuitTransition,
    OperationError, ResilienceError, RetryPolicy,
};

const TRANSITION_CHANNEL_CAPACITY: usize = 256;

/// Registry of circuit breakers keyed by dependency name
#[derive(Debug)]
pub struct CircuitBreakerRegistry {
    settings: CircuitBreakerSettings,
    retry_policy: RetryPolicy,
    breakers: RwLock<HashMap<String, Arc<CircuitBreaker>>>,
    transitions: broadcast::Sender<CircuitTransition>,
}

impl CircuitBreakerRegistry {
    pub fn new(settings: CircuitBreakerSettings, retry_policy: RetryPolicy) -> Self {
        let (transitions, _) = broadcast::channel(TRANSITION_CHANNEL_CAPACITY);
        Self {
            settings,
            retry_policy,
            breakers: RwLock::new(HashMap::new()),
            transitions,
        }
    }

    /// Subscribe to state transitions of every breaker in the registry
    pub fn subscribe(&self) -> broadcast::Receiver<CircuitTransition> {
        self.transitions.subscribe()
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Breaker for `dependency`, if one has been created
    pub fn get(&self, dependency: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(dependency)
            .cloned()
    }

    /// Breaker for `dependency`, created from its component config on first use
    pub fn get_or_create(&self, dependency: &str) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.get(dependency) {
            return existing;
        }

        let mut breakers = self.breakers.write().unwrap_or_else(|p| p.into_inner());
        breakers
            .entry(dependency.to_string())
            .or_insert_with(|| {
                let config = self
                    .settings
                    .config_for_component(dependency)
                    .to_resilience_config();
                tracing::debug!(
                    dependency,
                    failure_threshold = config.failure_threshold,
                    recovery_timeout_secs = config.recovery_timeout.as_secs(),
                    "Circuit breaker created"
                );
                Arc::new(
                    CircuitBreaker::new(dependency.to_string(), config)
                        .with_transition_sender(self.transitions.clone()),
                )
            })
            .clone()
    }

    /// Run `operation` through the breaker for `dependency`
    pub async fn call<T, E, F, Fut>(&self, dependency: &str, operation: F) -> Result<T, ResilienceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<ResilienceError>,
    {
        self.get_or_create(dependency).call(operation).await
    }

    /// Run `operation` as `CircuitBreaker(Retry(operation))`.
    ///
    /// The whole retry sequence counts as one call to the breaker, so a half-open
    /// trial may itself be retried before it is judged.
    pub async fn call_with_retry<T, F, Fut>(
        &self,
        dependency: &str,
        cancel: &CancellationToken,
        operation: F,
    ) -> Result<T, ResilienceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, OperationError>>,
    {
        let breaker = self.get_or_create(dependency);
        let policy = self.retry_policy;
        breaker
            .call(|| async move { execute_with_retry(&policy, cancel, operation).await })
            .await
    }

    /// Current state of `dependency` (closed if never called)
    pub fn state(&self, dependency: &str) -> CircuitState {
        self.get(dependency)
            .map_or(CircuitState::Closed, |breaker| breaker.state())
    }

    /// Number of breakers currently open or half-open
    pub fn unhealthy_count(&self) -> usize {
        self.breakers
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .values()
            .filter(|breaker| !breaker.is_healthy())
            .count()
    }

    /// Metrics for every breaker, ordered by dependency name
    pub fn snapshot(&self) -> BTreeMap<String, CircuitBreakerMetrics> {
        self.breakers
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .map(|(name, breaker)| (name.clone(), breaker.metrics()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CircuitBreakerComponentConfig;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn registry() -> CircuitBreakerRegistry {
        let mut settings = CircuitBreakerSettings::default();
        settings.component_configs.insert(
            "clay_api".to_string(),
            CircuitBreakerComponentConfig {
                failure_threshold: 3,
                recovery_timeout_seconds: 60,
                success_threshold: 1,
            },
        );
        let retry = RetryPolicy::default()
            .with_max_retries(2)
            .with_delays(Duration::from_millis(10), Duration::from_millis(100));
        CircuitBreakerRegistry::new(settings, retry)
    }

    #[test]
    fn test_breakers_created_once_per_dependency() {
        let registry = registry();
        let first = registry.get_or_create("clay_api");
        let second = registry.get_or_create("clay_api");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.config().failure_threshold, 3);

        // Unknown dependencies use the default config
        assert_eq!(registry.get_or_create("apollo_api").config().failure_threshold, 5);
        assert!(registry.get("never_called").is_none());
        assert_eq!(registry.state("never_called"), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_sequence_counts_as_single_breaker_call() {
        let registry = registry();
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<(), _> = registry
            .call_with_retry("clay_api", &CancellationToken::new(), || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err(OperationError::retryable("429 rate limited")) }
            })
            .await;

        assert!(matches!(
            result,
            Err(ResilienceError::MaxRetriesExceeded { attempts: 3, .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let metrics = registry.get("clay_api").unwrap().metrics();
        assert_eq!(metrics.total_calls, 1);
        assert_eq!(metrics.failure_count, 1);
        assert_eq!(metrics.current_state, CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_transitions_reach_subscribers() {
        let registry = registry();
        let mut rx = registry.subscribe();

        for _ in 0..3 {
            let _ = registry
                .call("clay_api", || async { Err::<(), _>(OperationError::retryable("503")) })
                .await;
        }

        let event = rx.recv().await.unwrap();
        assert_eq!(event.dependency, "clay_api");
        assert_eq!(event.to, CircuitState::Open);
        assert_eq!(registry.unhealthy_count(), 1);

        let snapshot = registry.snapshot();
        assert_eq!(snapshot["clay_api"].current_state, CircuitState::Open);
    }
}
