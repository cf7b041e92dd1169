mod model;

use std::collections::HashSet;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::config::BreakerConfig;
use crate::store::{Store, StoreError};

pub use model::{BreakerEvent, BreakerMode, BreakerState};

/// Gate decision for one remediation attempt. The breaker never errors
/// toward the caller; a broken state simply blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Blocked(BlockReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    /// OPEN and the cooldown has not elapsed yet.
    CoolingDown { remaining_secs: i64 },
    /// Another attempt for this service is still in flight.
    AttemptInFlight,
}

impl GateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GateDecision::Allow)
    }
}

/// Pure transition: checks whether an attempt may proceed, applying the lazy
/// OPEN -> HALF_OPEN move when the cooldown has elapsed. Returns the state to
/// persist alongside the decision.
pub fn evaluate_gate(
    mut state: BreakerState,
    config: &BreakerConfig,
    now: DateTime<Utc>,
) -> (BreakerState, GateDecision) {
    match state.mode {
        BreakerMode::Closed | BreakerMode::HalfOpen => (state, GateDecision::Allow),
        BreakerMode::Open => {
            let elapsed = state
                .opened_at
                .map(|opened_at| now.signed_duration_since(opened_at).num_seconds());
            match elapsed {
                Some(elapsed) if elapsed < config.cooldown_seconds as i64 => {
                    let remaining_secs = config.cooldown_seconds as i64 - elapsed;
                    (
                        state,
                        GateDecision::Blocked(BlockReason::CoolingDown { remaining_secs }),
                    )
                }
                _ => {
                    // Cooldown elapsed (or opened_at missing from a partial
                    // write): move to HALF_OPEN and let one probe through.
                    state.mode = BreakerMode::HalfOpen;
                    state.success_count = 0;
                    (state, GateDecision::Allow)
                }
            }
        }
    }
}

/// Pure transition for a finished attempt.
pub fn apply_outcome(
    mut state: BreakerState,
    success: bool,
    config: &BreakerConfig,
    now: DateTime<Utc>,
) -> (BreakerState, Option<BreakerEvent>) {
    if success {
        state.last_success_at = Some(now);
        match state.mode {
            BreakerMode::Closed => {
                state.failure_count = 0;
                (state, None)
            }
            BreakerMode::HalfOpen => {
                state.success_count += 1;
                if state.success_count >= config.success_threshold {
                    state.mode = BreakerMode::Closed;
                    state.failure_count = 0;
                    state.success_count = 0;
                    state.opened_at = None;
                    (state, Some(BreakerEvent::Closed))
                } else {
                    (state, None)
                }
            }
            // A late success while OPEN changes nothing; recovery goes
            // through HALF_OPEN.
            BreakerMode::Open => (state, None),
        }
    } else {
        state.last_failure_at = Some(now);
        match state.mode {
            BreakerMode::Closed => {
                state.failure_count += 1;
                if state.failure_count >= config.failure_threshold {
                    state.mode = BreakerMode::Open;
                    state.opened_at = Some(now);
                    (state, Some(BreakerEvent::Opened))
                } else {
                    (state, None)
                }
            }
            BreakerMode::HalfOpen => {
                state.mode = BreakerMode::Open;
                state.opened_at = Some(now);
                state.success_count = 0;
                (state, Some(BreakerEvent::Reopened))
            }
            BreakerMode::Open => {
                state.failure_count += 1;
                (state, None)
            }
        }
    }
}

/// Persisted per-service gate. All read-modify-write cycles for one service
/// run under the caller's per-service serialization; the in-flight set is the
/// tie-break for anything that slips past it.
pub struct CircuitBreaker {
    store: Store,
    in_flight: Mutex<HashSet<String>>,
}

impl CircuitBreaker {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Checks the gate and, on Allow, reserves the service until
    /// `settle` or `release` is called.
    pub fn allow(
        &self,
        service: &str,
        config: &BreakerConfig,
        now: DateTime<Utc>,
    ) -> Result<GateDecision, StoreError> {
        if self.lock_in_flight().contains(service) {
            return Ok(GateDecision::Blocked(BlockReason::AttemptInFlight));
        }

        let state = self.store.breaker_state(service)?.unwrap_or_default();
        let (next, decision) = evaluate_gate(state.clone(), config, now);
        if next != state {
            log::info!(
                "breaker_transition service={} from={} to={}",
                service,
                state.mode,
                next.mode
            );
            self.store.put_breaker_state(service, &next)?;
        }

        if decision.is_allowed() {
            self.lock_in_flight().insert(service.to_string());
        }
        Ok(decision)
    }

    /// Computes the post-attempt state and clears the in-flight reservation.
    /// The caller persists the returned state atomically with the action
    /// record via `Store::record_attempt_outcome`.
    pub fn settle(
        &self,
        service: &str,
        success: bool,
        config: &BreakerConfig,
        now: DateTime<Utc>,
    ) -> Result<(BreakerState, Option<BreakerEvent>), StoreError> {
        self.release(service);
        let state = self.store.breaker_state(service)?.unwrap_or_default();
        Ok(apply_outcome(state, success, config, now))
    }

    /// Drops the reservation without an outcome. Used when processing aborts
    /// between `allow` and execution (for example on a persistence error).
    pub fn release(&self, service: &str) {
        self.lock_in_flight().remove(service);
    }

    /// The reservation set must survive a panicked holder: a poisoned lock
    /// would otherwise disable the in-flight tie-break entirely.
    fn lock_in_flight(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self, service: &str) -> Result<BreakerState, StoreError> {
        Ok(self.store.breaker_state(service)?.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests;
