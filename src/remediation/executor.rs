use std::sync::Arc;
use std::time::Instant;

use tokio::time::Duration;

use crate::incidents::Incident;

use super::lifecycle::{ActiveLifecycleProvider, LifecycleProvider};
use super::model::ActionType;
use super::policy::ActionPlan;

/// Result of one attempt. Failures are data, not errors: the caller records
/// the outcome either way and the breaker decides what happens next.
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    pub success: bool,
    pub error: Option<String>,
    pub execution_time_ms: u64,
}

#[derive(Clone)]
pub struct RemediationExecutor {
    provider: Arc<ActiveLifecycleProvider>,
}

impl RemediationExecutor {
    pub fn new(provider: Arc<ActiveLifecycleProvider>) -> Self {
        Self { provider }
    }

    /// Runs the planned action under a hard deadline. Never panics and never
    /// propagates: anything that goes wrong becomes a failed outcome.
    pub async fn execute(
        &self,
        incident: &Incident,
        plan: &ActionPlan,
        timeout_secs: u64,
    ) -> ActionOutcome {
        let started = Instant::now();
        let call = async {
            match plan.action_type {
                ActionType::ScaleUp => {
                    self.provider
                        .start_container(&plan.target, timeout_secs)
                        .await
                }
                ActionType::ScaleDown => {
                    self.provider
                        .stop_container(&plan.target, timeout_secs)
                        .await
                }
                ActionType::RestartContainer | ActionType::Heal | ActionType::Manual => {
                    self.provider
                        .restart_container(&plan.target, timeout_secs)
                        .await
                }
            }
        };

        let result = tokio::time::timeout(Duration::from_secs(timeout_secs), call).await;
        let execution_time_ms = started.elapsed().as_millis() as u64;

        let error = match result {
            Ok(Ok(())) => None,
            Ok(Err(error)) => Some(error.to_string()),
            Err(_) => Some(format!("action timed out after {}s", timeout_secs)),
        };

        match &error {
            None => {
                log::info!(
                    "remediation_attempt_succeeded service={} action={} target={} elapsed_ms={}",
                    incident.service,
                    plan.action_type,
                    plan.target,
                    execution_time_ms
                );
            }
            Some(message) => {
                log::error!(
                    "remediation_attempt_failed service={} action={} target={} error={}",
                    incident.service,
                    plan.action_type,
                    plan.target,
                    message
                );
            }
        }

        ActionOutcome {
            success: error.is_none(),
            error,
            execution_time_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use serde_json::json;

    use crate::detectors::{FindingKind, Severity};
    use crate::incidents::{Incident, IncidentStatus};
    use crate::remediation::lifecycle::{ActiveLifecycleProvider, MockLifecycleProvider, MockStep};
    use crate::remediation::{ActionPlan, ActionType};

    use super::RemediationExecutor;

    fn incident() -> Incident {
        Incident {
            id: 7,
            uuid: "test-uuid".to_string(),
            service: "ar_app".to_string(),
            kind: FindingKind::HealthCheckFailed,
            severity: Severity::Critical,
            status: IncidentStatus::Active,
            details: json!({}),
            created_at: Utc::now(),
            last_seen_at: Utc::now(),
            resolved_at: None,
            resolution_secs: None,
        }
    }

    fn restart_plan() -> ActionPlan {
        ActionPlan {
            action_type: ActionType::RestartContainer,
            target: "ar_app_container".to_string(),
            reason: "health_check_failed".to_string(),
            triggered_by: "bot".to_string(),
        }
    }

    #[tokio::test]
    async fn successful_action_yields_clean_outcome() {
        let mock = MockLifecycleProvider::new(vec![MockStep::Succeed]);
        let executor = RemediationExecutor::new(Arc::new(ActiveLifecycleProvider::Mock(mock)));

        let outcome = executor.execute(&incident(), &restart_plan(), 10).await;
        assert!(outcome.success);
        assert!(outcome.error.is_none());
    }

    #[tokio::test]
    async fn provider_error_becomes_failed_outcome() {
        let mock = MockLifecycleProvider::new(vec![MockStep::Fail("no such container")]);
        let executor = RemediationExecutor::new(Arc::new(ActiveLifecycleProvider::Mock(mock)));

        let outcome = executor.execute(&incident(), &restart_plan(), 10).await;
        assert!(!outcome.success);
        assert!(
            outcome
                .error
                .as_deref()
                .is_some_and(|error| error.contains("no such container"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn hung_action_fails_at_the_deadline() {
        let mock = MockLifecycleProvider::new(vec![MockStep::Hang]);
        let executor = RemediationExecutor::new(Arc::new(ActiveLifecycleProvider::Mock(mock)));

        let outcome = executor.execute(&incident(), &restart_plan(), 10).await;
        assert!(!outcome.success);
        assert!(
            outcome
                .error
                .as_deref()
                .is_some_and(|error| error.contains("timed out"))
        );
    }

    #[tokio::test]
    async fn scale_actions_route_to_start_and_stop() {
        let mock = MockLifecycleProvider::new(vec![MockStep::Succeed, MockStep::Succeed]);
        let provider = Arc::new(ActiveLifecycleProvider::Mock(mock));
        let executor = RemediationExecutor::new(provider.clone());

        let mut plan = restart_plan();
        plan.action_type = ActionType::ScaleUp;
        plan.target = "ar_app_replica".to_string();
        executor.execute(&incident(), &plan, 10).await;

        plan.action_type = ActionType::ScaleDown;
        executor.execute(&incident(), &plan, 10).await;

        let ActiveLifecycleProvider::Mock(mock) = provider.as_ref() else {
            panic!("mock provider expected");
        };
        assert_eq!(
            mock.calls(),
            vec![
                ("start".to_string(), "ar_app_replica".to_string()),
                ("stop".to_string(), "ar_app_replica".to_string()),
            ]
        );
    }
}
