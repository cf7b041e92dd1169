use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::breaker::BreakerMode;
use crate::config::{
    BreakerConfig, IncidentsConfig, RemediationConfig, RuntimeConfig, ServiceConfig, Thresholds,
};
use crate::incidents::IncidentStatus;
use crate::metrics::{ActiveMetricsProvider, MockMetricsProvider, ServiceSnapshot};
use crate::notifications::Notifier;
use crate::remediation::{ActiveLifecycleProvider, MockLifecycleProvider, MockStep};
use crate::store::Store;

use super::Engine;

fn service() -> ServiceConfig {
    ServiceConfig {
        name: "ar_app".to_string(),
        metrics_url: "http://localhost:8080/health".to_string(),
        target: "ar_app_container".to_string(),
        scale_target: None,
    }
}

fn runtime(remediation: RemediationConfig, breaker: BreakerConfig) -> RuntimeConfig {
    RuntimeConfig {
        monitor_interval: 5,
        thresholds: Thresholds::default(),
        incidents: IncidentsConfig::default(),
        remediation,
        breaker,
    }
}

fn build_engine(
    store: Store,
    snapshots: Vec<ServiceSnapshot>,
    steps: Vec<MockStep>,
) -> (Arc<Engine>, Notifier, Arc<ActiveLifecycleProvider>) {
    let metrics = Arc::new(ActiveMetricsProvider::Mock(MockMetricsProvider::new(
        snapshots,
    )));
    let lifecycle = Arc::new(ActiveLifecycleProvider::Mock(MockLifecycleProvider::new(
        steps,
    )));
    let notifier = Notifier::for_tests();
    let engine = Engine::new(
        store,
        metrics,
        Arc::clone(&lifecycle),
        notifier.clone(),
        vec![service()],
        5,
    );
    (engine, notifier, lifecycle)
}

fn lifecycle_calls(provider: &ActiveLifecycleProvider) -> Vec<(String, String)> {
    let ActiveLifecycleProvider::Mock(mock) = provider else {
        panic!("mock provider expected");
    };
    mock.calls()
}

#[tokio::test]
async fn unreachable_service_is_restarted_and_resolved() {
    let temp = tempfile::tempdir().expect("temp dir");
    let store = Store::open(&temp.path().to_string_lossy()).expect("open store");
    let now = Utc::now();
    let (engine, notifier, lifecycle) = build_engine(
        store.clone(),
        vec![ServiceSnapshot::unreachable(
            "ar_app",
            "connection_refused",
            now,
        )],
        vec![MockStep::Succeed],
    );

    engine
        .run_tick(
            &runtime(RemediationConfig::default(), BreakerConfig::default()),
            now,
        )
        .await;

    assert_eq!(
        lifecycle_calls(&lifecycle),
        vec![("restart".to_string(), "ar_app_container".to_string())]
    );
    assert!(
        engine
            .incidents
            .active_for_service("ar_app")
            .expect("active scan")
            .is_empty()
    );
    assert_eq!(
        notifier.recorded_events(),
        vec![
            "incident_created",
            "remediation_succeeded",
            "incident_resolved"
        ]
    );

    let state = store
        .breaker_state("ar_app")
        .expect("breaker state")
        .unwrap_or_default();
    assert_eq!(state.mode, BreakerMode::Closed);
    assert_eq!(state.failure_count, 0);
}

#[tokio::test]
async fn repeated_failures_open_the_breaker_and_escalate() {
    let temp = tempfile::tempdir().expect("temp dir");
    let store = Store::open(&temp.path().to_string_lossy()).expect("open store");
    let base = Utc::now();
    let snapshots = (0..4)
        .map(|tick| {
            ServiceSnapshot::unreachable(
                "ar_app",
                "timeout",
                base + Duration::seconds(tick * 5),
            )
        })
        .collect();
    let (engine, notifier, lifecycle) = build_engine(
        store.clone(),
        snapshots,
        vec![
            MockStep::Fail("restart failed"),
            MockStep::Fail("restart failed"),
            MockStep::Fail("restart failed"),
        ],
    );

    let runtime = runtime(
        RemediationConfig {
            attempt_grace_secs: 0,
            max_actions_per_window: 10,
            ..RemediationConfig::default()
        },
        BreakerConfig {
            failure_threshold: 3,
            success_threshold: 1,
            cooldown_seconds: 120,
        },
    );

    engine.run_tick(&runtime, base).await;
    let incident_id = engine
        .incidents
        .active_for_service("ar_app")
        .expect("active scan")[0]
        .id;

    for tick in 1..4 {
        engine
            .run_tick(&runtime, base + Duration::seconds(tick * 5))
            .await;
    }

    // The open breaker blocks the fourth attempt.
    assert_eq!(lifecycle_calls(&lifecycle).len(), 3);

    let incident = store
        .get_incident(incident_id)
        .expect("fetch incident")
        .expect("incident exists");
    assert_eq!(incident.status, IncidentStatus::Escalated);

    let state = store
        .breaker_state("ar_app")
        .expect("breaker state")
        .unwrap_or_default();
    assert_eq!(state.mode, BreakerMode::Open);
    assert_eq!(state.failure_count, 3);

    let events = notifier.recorded_events();
    assert!(events.contains(&"circuit_opened".to_string()));
    assert!(events.contains(&"incident_escalated".to_string()));
}

#[tokio::test]
async fn exhausted_action_window_escalates_without_attempting() {
    let temp = tempfile::tempdir().expect("temp dir");
    let store = Store::open(&temp.path().to_string_lossy()).expect("open store");
    let base = Utc::now();
    let snapshots = (0..3)
        .map(|tick| {
            ServiceSnapshot::unreachable(
                "ar_app",
                "timeout",
                base + Duration::seconds(tick * 5),
            )
        })
        .collect();
    let (engine, notifier, lifecycle) = build_engine(
        store.clone(),
        snapshots,
        vec![
            MockStep::Fail("restart failed"),
            MockStep::Fail("restart failed"),
        ],
    );

    // High failure threshold keeps the breaker closed; only the window cap
    // can stop the third attempt.
    let runtime = runtime(
        RemediationConfig {
            attempt_grace_secs: 0,
            max_actions_per_window: 2,
            ..RemediationConfig::default()
        },
        BreakerConfig {
            failure_threshold: 10,
            success_threshold: 1,
            cooldown_seconds: 120,
        },
    );

    engine.run_tick(&runtime, base).await;
    let incident_id = engine
        .incidents
        .active_for_service("ar_app")
        .expect("active scan")[0]
        .id;
    for tick in 1..3 {
        engine
            .run_tick(&runtime, base + Duration::seconds(tick * 5))
            .await;
    }

    assert_eq!(lifecycle_calls(&lifecycle).len(), 2);

    let incident = store
        .get_incident(incident_id)
        .expect("fetch incident")
        .expect("incident exists");
    assert_eq!(incident.status, IncidentStatus::Escalated);

    let state = store
        .breaker_state("ar_app")
        .expect("breaker state")
        .unwrap_or_default();
    assert_eq!(state.mode, BreakerMode::Closed);

    assert!(
        notifier
            .recorded_events()
            .contains(&"incident_escalated".to_string())
    );
}

#[tokio::test]
async fn cooldown_outage_escalates_once_without_incident_churn() {
    let temp = tempfile::tempdir().expect("temp dir");
    let store = Store::open(&temp.path().to_string_lossy()).expect("open store");
    let base = Utc::now();
    let snapshots = (0..5)
        .map(|tick| {
            ServiceSnapshot::unreachable(
                "ar_app",
                "timeout",
                base + Duration::seconds(tick * 5),
            )
        })
        .collect();
    let (engine, notifier, lifecycle) = build_engine(
        store.clone(),
        snapshots,
        vec![MockStep::Fail("restart failed")],
    );

    // One failure opens the breaker; every later tick of the outage lands
    // inside the cooldown.
    let runtime = runtime(
        RemediationConfig {
            attempt_grace_secs: 0,
            max_actions_per_window: 10,
            ..RemediationConfig::default()
        },
        BreakerConfig {
            failure_threshold: 1,
            success_threshold: 1,
            cooldown_seconds: 120,
        },
    );

    for tick in 0..5 {
        engine
            .run_tick(&runtime, base + Duration::seconds(tick * 5))
            .await;
    }

    assert_eq!(lifecycle_calls(&lifecycle).len(), 1);

    let events = notifier.recorded_events();
    let created = events.iter().filter(|event| *event == "incident_created").count();
    let escalated = events
        .iter()
        .filter(|event| *event == "incident_escalated")
        .count();
    assert_eq!(created, 1);
    assert_eq!(escalated, 1);
    assert!(
        engine
            .incidents
            .active_for_service("ar_app")
            .expect("active scan")
            .is_empty()
    );
}

#[tokio::test]
async fn held_service_lock_skips_the_tick() {
    let temp = tempfile::tempdir().expect("temp dir");
    let store = Store::open(&temp.path().to_string_lossy()).expect("open store");
    let now = Utc::now();
    let (engine, notifier, _lifecycle) = build_engine(
        store,
        vec![ServiceSnapshot::unreachable("ar_app", "timeout", now)],
        vec![MockStep::Succeed],
    );
    let config = runtime(RemediationConfig::default(), BreakerConfig::default());

    {
        let _busy = engine
            .locks
            .get("ar_app")
            .expect("service lock")
            .try_lock()
            .expect("hold lock");
        engine.run_tick(&config, now).await;
        assert!(notifier.recorded_events().is_empty());
    }

    // Lock released: the queued snapshot is processed normally.
    engine.run_tick(&config, now).await;
    assert!(
        notifier
            .recorded_events()
            .contains(&"incident_created".to_string())
    );
}
