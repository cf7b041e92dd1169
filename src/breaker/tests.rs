use chrono::{Duration, TimeZone, Utc};

use crate::config::BreakerConfig;
use crate::store::Store;

use super::{
    BlockReason, BreakerEvent, BreakerMode, BreakerState, CircuitBreaker, GateDecision,
    apply_outcome, evaluate_gate,
};

fn test_config() -> BreakerConfig {
    BreakerConfig {
        failure_threshold: 3,
        success_threshold: 1,
        cooldown_seconds: 120,
    }
}

#[test]
fn opens_after_exactly_failure_threshold_failures() {
    let config = test_config();
    let now = Utc::now();
    let mut state = BreakerState::default();

    for failure in 1..=2 {
        let (next, event) = apply_outcome(state, false, &config, now);
        state = next;
        assert_eq!(state.mode, BreakerMode::Closed);
        assert_eq!(state.failure_count, failure);
        assert!(event.is_none());
    }

    let (opened, event) = apply_outcome(state, false, &config, now);
    assert_eq!(opened.mode, BreakerMode::Open);
    assert_eq!(opened.failure_count, 3);
    assert_eq!(opened.opened_at, Some(now));
    assert_eq!(event, Some(BreakerEvent::Opened));
}

#[test]
fn success_resets_failure_count_while_closed() {
    let config = test_config();
    let now = Utc::now();

    let (state, _) = apply_outcome(BreakerState::default(), false, &config, now);
    let (state, _) = apply_outcome(state, false, &config, now);
    assert_eq!(state.failure_count, 2);

    let (state, event) = apply_outcome(state, true, &config, now);
    assert_eq!(state.failure_count, 0);
    assert_eq!(state.mode, BreakerMode::Closed);
    assert!(event.is_none());

    // The earlier failures no longer count toward opening.
    let (state, event) = apply_outcome(state, false, &config, now);
    assert_eq!(state.failure_count, 1);
    assert!(event.is_none());
}

#[test]
fn cooldown_boundary_controls_half_open_transition() {
    let config = test_config();
    let opened_at = Utc.with_ymd_and_hms(2026, 8, 25, 12, 0, 0).unwrap();
    let open_state = BreakerState {
        mode: BreakerMode::Open,
        failure_count: 3,
        opened_at: Some(opened_at),
        ..BreakerState::default()
    };

    // T+119: still cooling down.
    let (state, decision) =
        evaluate_gate(open_state.clone(), &config, opened_at + Duration::seconds(119));
    assert_eq!(state.mode, BreakerMode::Open);
    assert_eq!(
        decision,
        GateDecision::Blocked(BlockReason::CoolingDown { remaining_secs: 1 })
    );

    // T+121: lazy transition to HALF_OPEN, one attempt allowed.
    let (state, decision) =
        evaluate_gate(open_state, &config, opened_at + Duration::seconds(121));
    assert_eq!(state.mode, BreakerMode::HalfOpen);
    assert_eq!(decision, GateDecision::Allow);
}

#[test]
fn half_open_failure_reopens_and_restamps() {
    let config = test_config();
    let first_open = Utc.with_ymd_and_hms(2026, 8, 25, 12, 0, 0).unwrap();
    let retry_at = first_open + Duration::seconds(130);

    let half_open = BreakerState {
        mode: BreakerMode::HalfOpen,
        failure_count: 3,
        opened_at: Some(first_open),
        ..BreakerState::default()
    };

    let (state, event) = apply_outcome(half_open, false, &config, retry_at);
    assert_eq!(state.mode, BreakerMode::Open);
    assert_eq!(state.opened_at, Some(retry_at));
    assert_eq!(state.success_count, 0);
    assert_eq!(event, Some(BreakerEvent::Reopened));
}

#[test]
fn half_open_closes_after_success_threshold() {
    let config = BreakerConfig {
        success_threshold: 2,
        ..test_config()
    };
    let now = Utc::now();
    let half_open = BreakerState {
        mode: BreakerMode::HalfOpen,
        failure_count: 3,
        opened_at: Some(now - Duration::seconds(200)),
        ..BreakerState::default()
    };

    let (state, event) = apply_outcome(half_open, true, &config, now);
    assert_eq!(state.mode, BreakerMode::HalfOpen);
    assert_eq!(state.success_count, 1);
    assert!(event.is_none());

    let (state, event) = apply_outcome(state, true, &config, now);
    assert_eq!(state.mode, BreakerMode::Closed);
    assert_eq!(state.failure_count, 0);
    assert_eq!(state.success_count, 0);
    assert_eq!(state.opened_at, None);
    assert_eq!(event, Some(BreakerEvent::Closed));
}

#[test]
fn gate_reserves_service_until_settled() {
    let temp = tempfile::tempdir().expect("temp dir");
    let store = Store::open(&temp.path().to_string_lossy()).expect("open store");
    let breaker = CircuitBreaker::new(store.clone());
    let config = test_config();
    let now = Utc::now();

    assert_eq!(
        breaker.allow("ar_app", &config, now).expect("first allow"),
        GateDecision::Allow
    );
    // Same service, attempt still in flight: blocked.
    assert_eq!(
        breaker.allow("ar_app", &config, now).expect("second allow"),
        GateDecision::Blocked(BlockReason::AttemptInFlight)
    );
    // Other services are unaffected.
    assert_eq!(
        breaker.allow("ar_app_replica", &config, now).expect("other"),
        GateDecision::Allow
    );

    let (state, event) = breaker
        .settle("ar_app", true, &config, now)
        .expect("settle");
    assert!(event.is_none());
    store
        .put_breaker_state("ar_app", &state)
        .expect("persist settled state");

    assert_eq!(
        breaker.allow("ar_app", &config, now).expect("after settle"),
        GateDecision::Allow
    );
}

#[test]
fn release_frees_reservation_without_outcome() {
    let temp = tempfile::tempdir().expect("temp dir");
    let store = Store::open(&temp.path().to_string_lossy()).expect("open store");
    let breaker = CircuitBreaker::new(store);
    let config = test_config();
    let now = Utc::now();

    assert!(breaker.allow("ar_app", &config, now).expect("allow").is_allowed());
    breaker.release("ar_app");
    assert!(breaker.allow("ar_app", &config, now).expect("again").is_allowed());
}

#[test]
fn reservation_set_survives_a_panicked_holder() {
    let temp = tempfile::tempdir().expect("temp dir");
    let store = Store::open(&temp.path().to_string_lossy()).expect("open store");
    let breaker = CircuitBreaker::new(store);
    let config = test_config();
    let now = Utc::now();

    std::thread::scope(|scope| {
        let handle = scope.spawn(|| {
            let _guard = breaker.in_flight.lock().expect("lock");
            panic!("poison the reservation lock");
        });
        assert!(handle.join().is_err());
    });

    // The gate still works and still enforces the tie-break.
    assert!(breaker.allow("ar_app", &config, now).expect("allow").is_allowed());
    assert_eq!(
        breaker.allow("ar_app", &config, now).expect("second"),
        GateDecision::Blocked(BlockReason::AttemptInFlight)
    );
    breaker.release("ar_app");
    assert!(breaker.allow("ar_app", &config, now).expect("after release").is_allowed());
}

#[test]
fn lazy_half_open_transition_is_persisted() {
    let temp = tempfile::tempdir().expect("temp dir");
    let store = Store::open(&temp.path().to_string_lossy()).expect("open store");
    let breaker = CircuitBreaker::new(store.clone());
    let config = test_config();

    let opened_at = Utc::now() - Duration::seconds(300);
    store
        .put_breaker_state(
            "ar_app",
            &BreakerState {
                mode: BreakerMode::Open,
                failure_count: 3,
                opened_at: Some(opened_at),
                ..BreakerState::default()
            },
        )
        .expect("seed open state");

    assert!(
        breaker
            .allow("ar_app", &config, Utc::now())
            .expect("allow")
            .is_allowed()
    );
    let state = breaker.state("ar_app").expect("state");
    assert_eq!(state.mode, BreakerMode::HalfOpen);
}
