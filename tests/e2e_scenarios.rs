//! End-to-end scenarios across the whole control plane.
//!
//! Each test builds a [`ControlPlane`] from configuration and drives it the way
//! a campaign runner would: external calls through the breaker registry, drift
//! checks on lead features, assurance cases over live evidence.

mod common;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serial_test::serial;

use outreach_core::adaptive::assurance::{
    AssuranceCaseDefinition, BuiltinAction, CaseStatus, Severity,
};
use outreach_core::adaptive::drift::PsiSeverity;
use outreach_core::adaptive::learning::{CampaignOutcome, StateKey};
use outreach_core::adaptive::ControlPlane;
use outreach_core::shared::config::{ConfigManager, CONFIG_PATH_ENV};
use outreach_core::shared::degradation::{DegradationError, DegradationLevel, Operation};
use outreach_core::shared::resilience::{CircuitState, OperationError, ResilienceError};

use common::{base_config_path, campaign_actions, fast_config, recording_plane, with_breaker};

async fn wait_for_level(plane: &ControlPlane, level: DegradationLevel) {
    let degradation = plane.degradation().clone();
    tokio::time::timeout(Duration::from_secs(5), async move {
        while degradation.current_level() != level {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("degradation level reached");
}

#[test]
fn test_deliverability_drop_pauses_outbound() {
    let (plane, notifier) = recording_plane(fast_config());

    plane
        .drift()
        .set_baseline("deliverability_rate", &[0.97; 100])
        .unwrap();
    let report = plane
        .drift()
        .check_drift("deliverability_rate", &[0.80; 100])
        .unwrap();

    assert!(report.has_drift);
    assert!(report.mean_shift_detected());
    assert!(report.shift_magnitude > 2.0);
    assert_eq!(report.psi_severity(), Some(PsiSeverity::High));
    // Feature drift on its own only reduces service
    assert_eq!(plane.degradation().current_level(), DegradationLevel::Reduced);

    plane
        .assurance()
        .define_assurance_case(
            AssuranceCaseDefinition::builder()
                .name("email_deliverability")
                .claim("Email deliverability stays at or above 95%")
                .evidence_collector(plane.latest_mean_evidence("deliverability_rate"))
                .threshold_min(0.95)
                .action_on_violation(BuiltinAction::PauseOperations)
                .severity(Severity::Critical)
                .build(),
        )
        .unwrap();

    let results = plane.assurance().verify_all();
    assert_eq!(results.get("email_deliverability"), Some(&false));

    let alerts = plane.assurance().alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].case_name, "email_deliverability");
    assert!((alerts[0].evidence - 0.80).abs() < 1e-9);
    assert_eq!(alerts[0].threshold_min, Some(0.95));
    assert_eq!(alerts[0].severity, Severity::Critical);

    assert_eq!(
        plane.degradation().current_level(),
        DegradationLevel::Maintenance
    );
    assert!(matches!(
        plane.degradation().ensure_permitted(Operation::SendEmails),
        Err(DegradationError::MaintenanceMode {
            operation: Operation::SendEmails
        })
    ));
    assert!(plane
        .degradation()
        .ensure_permitted(Operation::ReadCachedData)
        .is_ok());

    // Pausing does not page anyone by itself
    assert!(notifier.received().is_empty());
    assert_eq!(
        plane
            .assurance()
            .case_snapshot("email_deliverability")
            .unwrap()
            .status,
        CaseStatus::Failed
    );
}

#[tokio::test]
async fn test_clay_api_breaker_short_circuits_after_threshold() {
    let config = with_breaker(fast_config(), "clay_api", 3, 30);
    let plane = ControlPlane::new(config, campaign_actions()).unwrap();
    plane.start();

    let invocations = Arc::new(AtomicU32::new(0));
    for _ in 0..3 {
        let counter = invocations.clone();
        let result: Result<(), _> = plane
            .breakers()
            .call("clay_api", || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(OperationError::retryable("429 too many requests"))
            })
            .await;
        assert!(matches!(result, Err(ResilienceError::Operation(_))));
    }
    assert_eq!(plane.breakers().state("clay_api"), CircuitState::Open);

    let counter = invocations.clone();
    let rejected: Result<(), _> = plane
        .breakers()
        .call("clay_api", || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, OperationError>(())
        })
        .await;
    assert_eq!(
        rejected,
        Err(ResilienceError::CircuitOpen {
            dependency: "clay_api".to_string()
        })
    );
    assert_eq!(invocations.load(Ordering::SeqCst), 3);

    // clay_api is an enrichment dependency
    wait_for_level(&plane, DegradationLevel::Reduced).await;
    assert!(matches!(
        plane.degradation().ensure_permitted(Operation::EnrichLeads),
        Err(DegradationError::OperationUnavailable {
            operation: Operation::EnrichLeads,
            level: DegradationLevel::Reduced,
        })
    ));
    assert!(plane.degradation().is_permitted(Operation::SendEmails));

    let metrics = plane.breakers().snapshot()["clay_api"].clone();
    assert_eq!(metrics.total_calls, 3);
    assert_eq!(metrics.failure_count, 3);
    assert_eq!(metrics.rejected_calls, 1);

    plane.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_breaker_recovers_and_degradation_resets() {
    let config = with_breaker(fast_config(), "apollo_api", 2, 30);
    let plane = ControlPlane::new(config, campaign_actions()).unwrap();

    for _ in 0..2 {
        let _ = plane
            .breakers()
            .call("apollo_api", || async {
                Err::<(), _>(OperationError::retryable("connection reset"))
            })
            .await;
    }
    plane.degradation().adjust_operation("apollo_api");
    assert_eq!(plane.breakers().state("apollo_api"), CircuitState::Open);

    tokio::time::advance(Duration::from_secs(31)).await;

    let trial = plane
        .breakers()
        .call("apollo_api", || async { Ok::<_, OperationError>("enriched") })
        .await;
    assert_eq!(trial, Ok("enriched"));
    assert_eq!(plane.breakers().state("apollo_api"), CircuitState::Closed);

    let recovery_streak = plane.config().degradation.recovery_streak;
    for _ in 1..recovery_streak {
        assert!(!plane.degradation().record_health_check(true));
    }
    assert!(plane.degradation().record_health_check(true));
    assert_eq!(plane.degradation().current_level(), DegradationLevel::Full);
}

#[tokio::test(start_paused = true)]
async fn test_retried_call_counts_once_against_breaker() {
    let config = with_breaker(fast_config(), "hubspot_api", 2, 60);
    let plane = ControlPlane::new(config, campaign_actions()).unwrap();
    let cancel = plane.cancellation_token();

    let attempts = Arc::new(AtomicU32::new(0));
    let counter = attempts.clone();
    let result = plane
        .breakers()
        .call_with_retry("hubspot_api", &cancel, || {
            let attempt = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Err(OperationError::retryable("503 service unavailable"))
                } else {
                    Ok(attempt + 1)
                }
            }
        })
        .await;

    assert_eq!(result, Ok(3));
    assert_eq!(attempts.load(Ordering::SeqCst), 3);

    let metrics = plane.breakers().snapshot()["hubspot_api"].clone();
    assert_eq!(metrics.total_calls, 1);
    assert_eq!(metrics.success_count, 1);
    assert_eq!(metrics.failure_count, 0);
    assert_eq!(plane.breakers().state("hubspot_api"), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_retry_backoff_without_tripping_breaker() {
    let mut config = with_breaker(fast_config(), "instantly_api", 1, 120);
    config.retry.base_delay_ms = 1_000;
    config.retry.max_delay_ms = 60_000;
    let plane = ControlPlane::new(config, campaign_actions()).unwrap();
    let cancel = plane.cancellation_token();

    let (result, ()) = tokio::join!(
        plane
            .breakers()
            .call_with_retry("instantly_api", &cancel, || async {
                Err::<(), _>(OperationError::retryable("timeout"))
            }),
        async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            plane.shutdown().await;
        }
    );

    assert_eq!(result, Err(ResilienceError::Cancelled { attempts: 1 }));
    // Cancellation says nothing about the dependency
    assert_eq!(plane.breakers().state("instantly_api"), CircuitState::Closed);
    assert_eq!(plane.breakers().snapshot()["instantly_api"].failure_count, 0);
}

#[tokio::test]
async fn test_concurrent_failures_open_breaker_once() {
    let config = with_breaker(fast_config(), "scraper", 3, 60);
    let plane = ControlPlane::new(config, campaign_actions()).unwrap();
    let mut transitions = plane.breakers().subscribe();

    let calls = (0..20).map(|_| {
        plane.breakers().call("scraper", || async {
            tokio::task::yield_now().await;
            Err::<(), _>(OperationError::retryable("blocked"))
        })
    });
    let results = futures::future::join_all(calls).await;
    assert!(results
        .iter()
        .all(|r| matches!(r, Err(ResilienceError::Operation(_)))));

    assert_eq!(plane.breakers().state("scraper"), CircuitState::Open);
    let opened = transitions.try_recv().unwrap();
    assert_eq!(opened.dependency, "scraper");
    assert_eq!(opened.to, CircuitState::Open);
    assert!(transitions.try_recv().is_err());

    let rejected = plane
        .breakers()
        .call("scraper", || async { Ok::<_, OperationError>(()) })
        .await;
    assert!(matches!(rejected, Err(ResilienceError::CircuitOpen { .. })));

    let metrics = plane.breakers().snapshot()["scraper"].clone();
    assert_eq!(metrics.total_calls, 20);
    assert_eq!(metrics.failure_count, 20);
    assert_eq!(metrics.rejected_calls, 1);
}

#[tokio::test(start_paused = true)]
async fn test_periodic_verification_notifies_team() {
    let mut config = fast_config();
    config.assurance.verification_interval_seconds = 60;
    let (plane, notifier) = recording_plane(config);

    plane
        .assurance()
        .define_assurance_case(
            AssuranceCaseDefinition::builder()
                .name("service_level")
                .claim("Outreach runs at limited service or better")
                .evidence_collector(plane.degradation_level_evidence())
                .threshold_max(2.0)
                .action_on_violation(BuiltinAction::NotifyTeam)
                .severity(Severity::High)
                .build(),
        )
        .unwrap();
    plane
        .degradation()
        .escalate_to(DegradationLevel::Essential, "email_provider outage");

    plane.start();
    // First pass runs immediately, the second at 60s
    tokio::time::sleep(Duration::from_secs(61)).await;
    plane.shutdown().await;

    let received = notifier.received();
    assert_eq!(received.len(), 2);
    assert!(received
        .iter()
        .all(|alert| alert.case_name == "service_level" && alert.evidence == 3.0));
    assert_eq!(plane.assurance().alert_count(), 2);
    // Notifying does not change the level
    assert_eq!(
        plane.degradation().current_level(),
        DegradationLevel::Essential
    );
}

#[tokio::test]
async fn test_policy_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let policy_path = dir.path().join("policies").join("outreach.json");

    let mut config = fast_config();
    config.learning.policy_path = Some(policy_path.display().to_string());

    let state = StateKey::from("tier_1|high|linkedin|tue|morning");
    let next_state = StateKey::from("tier_1|high|linkedin|thu|morning");

    let first = ControlPlane::new(config.clone(), campaign_actions()).unwrap();
    let action = first.learning().action_space().actions()[3].clone();
    let outcome = CampaignOutcome {
        opens: 1,
        replies: 1,
        meetings_booked: 1,
        ..Default::default()
    };
    let reward = first
        .learning()
        .record_outcome(&state, &action, &outcome, &next_state)
        .unwrap();
    assert_eq!(reward, 61.0);
    first.learning().end_episode();
    first.start();
    first.shutdown().await;

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&policy_path).unwrap()).unwrap();
    let stored = saved["q_table"][state.as_str()][action.key()].as_f64().unwrap();
    assert!((stored - 6.1).abs() < 1e-9);
    assert_eq!(saved["episode_rewards"][0].as_f64(), Some(61.0));

    // A fresh plane picks the policy up from config
    let second = ControlPlane::new(config, campaign_actions()).unwrap();
    assert_eq!(
        second.learning().q_value(&state, &action).to_bits(),
        first.learning().q_value(&state, &action).to_bits()
    );
    assert_eq!(second.learning().greedy_action(&state), &action);
    assert_eq!(second.learning().episode_rewards(), vec![61.0]);

    // Unseen states still get the configured fallback
    let unseen = StateKey::from("tier_3|low|webinar|sun|night");
    assert_eq!(
        second.learning().greedy_action(&unseen),
        second.learning().fallback_action()
    );
}

#[test]
#[serial]
fn test_sample_config_builds_control_plane() {
    std::env::set_var(CONFIG_PATH_ENV, base_config_path());
    let loaded = ConfigManager::load();
    std::env::remove_var(CONFIG_PATH_ENV);

    let manager = loaded.unwrap();
    assert_eq!(manager.source_path(), Some(base_config_path().as_path()));

    let config = manager.into_config();
    assert_eq!(
        config.circuit_breakers.config_for_component("clay_api").failure_threshold,
        3
    );
    assert_eq!(config.degradation.component_levels.get("warehouse"), Some(&3));

    let plane = ControlPlane::new(config, campaign_actions()).unwrap();
    assert_eq!(
        plane.learning().fallback_action().key(),
        "pain_point:immediate:light"
    );
    assert_eq!(
        plane.degradation().adjust_operation("warehouse"),
        DegradationLevel::Essential
    );
}

#[test]
#[serial]
fn test_environment_overrides_sample_config() {
    std::env::set_var("OUTREACH__RETRY__MAX_RETRIES", "7");
    let loaded = ConfigManager::load_from_path(base_config_path());
    std::env::remove_var("OUTREACH__RETRY__MAX_RETRIES");

    let config = loaded.unwrap().into_config();
    assert_eq!(config.retry.max_retries, 7);
    assert_eq!(config.retry.to_retry_policy().max_retries, 7);
}
