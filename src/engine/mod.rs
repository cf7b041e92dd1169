use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::breaker::{BlockReason, BreakerEvent, CircuitBreaker, GateDecision};
use crate::config::{RuntimeConfig, ServiceConfig};
use crate::detectors;
use crate::incidents::{Incident, IncidentManager};
use crate::metrics::{ActiveMetricsProvider, MetricsProvider, SnapshotHistory};
use crate::notifications::{NotificationEvent, Notifier};
use crate::rate_limit::RateLimiter;
use crate::remediation::{
    ActionPlan, ActiveLifecycleProvider, RemediationAction, RemediationExecutor, plan_for,
};
use crate::store::Store;

/// One detect -> dedupe -> gate -> act pass over all services.
///
/// Services run concurrently within a tick; everything for one service runs
/// under its per-service lock, so overlapping ticks cannot double-act on the
/// same service.
pub struct Engine {
    store: Store,
    incidents: IncidentManager,
    breaker: CircuitBreaker,
    limiter: RateLimiter,
    executor: RemediationExecutor,
    metrics: Arc<ActiveMetricsProvider>,
    notifier: Notifier,
    services: Vec<ServiceConfig>,
    locks: HashMap<String, Mutex<()>>,
    history: Mutex<SnapshotHistory>,
}

impl Engine {
    pub fn new(
        store: Store,
        metrics: Arc<ActiveMetricsProvider>,
        lifecycle: Arc<ActiveLifecycleProvider>,
        notifier: Notifier,
        services: Vec<ServiceConfig>,
        monitor_interval: u64,
    ) -> Arc<Self> {
        let locks = services
            .iter()
            .map(|service| (service.name.clone(), Mutex::new(())))
            .collect();

        Arc::new(Self {
            incidents: IncidentManager::new(store.clone(), notifier.clone()),
            breaker: CircuitBreaker::new(store.clone()),
            limiter: RateLimiter::new(store.clone()),
            executor: RemediationExecutor::new(lifecycle),
            history: Mutex::new(SnapshotHistory::with_monitor_interval_secs(
                monitor_interval,
            )),
            store,
            metrics,
            notifier,
            services,
            locks,
        })
    }

    pub async fn run_tick(self: &Arc<Self>, runtime: &RuntimeConfig, now: DateTime<Utc>) {
        let mut handles = Vec::with_capacity(self.services.len());
        for service in &self.services {
            let engine = Arc::clone(self);
            let service = service.clone();
            let runtime = runtime.clone();
            handles.push(tokio::spawn(async move {
                engine.process_service(&service, &runtime, now).await;
            }));
        }
        for handle in handles {
            if let Err(error) = handle.await {
                log::error!("service_task_panicked error={}", error);
            }
        }
    }

    async fn process_service(
        &self,
        service: &ServiceConfig,
        runtime: &RuntimeConfig,
        now: DateTime<Utc>,
    ) {
        let Some(lock) = self.locks.get(&service.name) else {
            return;
        };
        let Ok(_guard) = lock.try_lock() else {
            log::warn!(
                "service_tick_skipped service={} reason=previous_tick_running",
                service.name
            );
            return;
        };

        let snapshot = self.metrics.get_snapshot(service, now).await;
        let prior = {
            let mut history = self.history.lock().await;
            let needed = runtime.thresholds.cpu_sustained_ticks.saturating_sub(1) as usize;
            let prior = history.recent(&service.name, needed);
            history.push(snapshot.clone());
            prior
        };

        for finding in detectors::run_all(&snapshot, &prior, &runtime.thresholds, now) {
            if let Err(error) = self
                .incidents
                .record(finding, runtime.incidents.dedupe_secs)
            {
                log::error!(
                    "finding_record_failed service={} error={}",
                    service.name,
                    error
                );
                return;
            }
        }

        let active = match self.incidents.active_for_service(&service.name) {
            Ok(active) => active,
            Err(error) => {
                log::error!(
                    "active_incident_scan_failed service={} error={}",
                    service.name,
                    error
                );
                return;
            }
        };

        for incident in active {
            self.consider_remediation(service, runtime, incident, now)
                .await;
        }
    }

    async fn consider_remediation(
        &self,
        service: &ServiceConfig,
        runtime: &RuntimeConfig,
        incident: Incident,
        now: DateTime<Utc>,
    ) {
        // A fresh attempt needs time to take effect before we pile on.
        match self.store.last_action_at(incident.id) {
            Ok(Some(last_attempt))
                if now.signed_duration_since(last_attempt).num_seconds()
                    < runtime.remediation.attempt_grace_secs as i64 =>
            {
                return;
            }
            Ok(_) => {}
            Err(error) => {
                log::error!(
                    "attempt_lookup_failed incident_id={} error={}",
                    incident.id,
                    error
                );
                return;
            }
        }

        let Some(plan) = plan_for(&incident, service, &runtime.remediation) else {
            return;
        };

        // The rate limiter caps raw frequency and is checked before the
        // breaker: exhausting the window escalates even while the breaker
        // would still allow attempts.
        match self
            .limiter
            .allow(&incident.service, plan.action_type, &runtime.remediation, now)
        {
            Ok(true) => {}
            Ok(false) => {
                if let Err(error) = self.incidents.escalate(incident.id, "rate_limited", now) {
                    log::error!(
                        "escalation_failed incident_id={} error={}",
                        incident.id,
                        error
                    );
                }
                return;
            }
            Err(error) => {
                log::error!(
                    "rate_limit_check_failed service={} error={}",
                    incident.service,
                    error
                );
                return;
            }
        }

        match self.breaker.allow(&incident.service, &runtime.breaker, now) {
            Ok(GateDecision::Allow) => {}
            Ok(GateDecision::Blocked(BlockReason::CoolingDown { remaining_secs })) => {
                log::warn!(
                    "remediation_blocked service={} reason=circuit_open remaining_secs={}",
                    incident.service,
                    remaining_secs
                );
                if let Err(error) = self.incidents.escalate(incident.id, "circuit_open", now) {
                    log::error!(
                        "escalation_failed incident_id={} error={}",
                        incident.id,
                        error
                    );
                }
                return;
            }
            Ok(GateDecision::Blocked(BlockReason::AttemptInFlight)) => {
                log::warn!(
                    "remediation_blocked service={} reason=attempt_in_flight",
                    incident.service
                );
                return;
            }
            Err(error) => {
                log::error!(
                    "breaker_check_failed service={} error={}",
                    incident.service,
                    error
                );
                return;
            }
        }

        let outcome = self
            .executor
            .execute(&incident, &plan, runtime.remediation.action_timeout_secs)
            .await;

        let (breaker_state, breaker_event) = match self.breaker.settle(
            &incident.service,
            outcome.success,
            &runtime.breaker,
            now,
        ) {
            Ok(settled) => settled,
            Err(error) => {
                log::error!(
                    "breaker_settle_failed service={} error={}",
                    incident.service,
                    error
                );
                return;
            }
        };

        let action = match self.build_action(&incident, &plan, &outcome, now) {
            Ok(action) => action,
            Err(error) => {
                log::error!(
                    "action_id_allocation_failed incident_id={} error={}",
                    incident.id,
                    error
                );
                return;
            }
        };

        // Audit row, rate-limit window entry and breaker state land together.
        if let Err(error) = self.store.record_attempt_outcome(&action, &breaker_state) {
            log::error!(
                "attempt_record_failed incident_id={} error={}",
                incident.id,
                error
            );
            return;
        }

        match breaker_event {
            Some(BreakerEvent::Opened) | Some(BreakerEvent::Reopened) => {
                log::error!(
                    "circuit_opened service={} failure_count={}",
                    incident.service,
                    breaker_state.failure_count
                );
                self.notifier.dispatch(NotificationEvent::CircuitOpened {
                    service: incident.service.clone(),
                    failure_count: breaker_state.failure_count,
                });
            }
            Some(BreakerEvent::Closed) => {
                log::info!("circuit_closed service={}", incident.service);
            }
            None => {}
        }

        if action.success {
            self.notifier
                .dispatch(NotificationEvent::RemediationSucceeded {
                    action: action.clone(),
                });
            if let Err(error) = self.incidents.resolve(incident.id, now) {
                log::error!(
                    "incident_resolve_failed incident_id={} error={}",
                    incident.id,
                    error
                );
            }
        } else {
            // The incident stays ACTIVE; the next tick decides whether to
            // retry, cool down, or escalate.
            self.notifier
                .dispatch(NotificationEvent::RemediationFailed { action });
        }
    }

    fn build_action(
        &self,
        incident: &Incident,
        plan: &ActionPlan,
        outcome: &crate::remediation::ActionOutcome,
        now: DateTime<Utc>,
    ) -> Result<RemediationAction, crate::store::StoreError> {
        Ok(RemediationAction {
            id: self.store.generate_id()?,
            uuid: uuid::Uuid::new_v4().to_string(),
            incident_id: incident.id,
            service: incident.service.clone(),
            action_type: plan.action_type,
            target: plan.target.clone(),
            success: outcome.success,
            error: outcome.error.clone(),
            execution_time_ms: outcome.execution_time_ms,
            triggered_by: plan.triggered_by.clone(),
            created_at: now,
        })
    }
}

#[cfg(test)]
mod tests;
