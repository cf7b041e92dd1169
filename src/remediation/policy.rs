use crate::config::{RemediationConfig, ServiceConfig};
use crate::detectors::FindingKind;
use crate::incidents::Incident;

use super::model::ActionType;

/// What to run for one incident, resolved from policy before any gating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionPlan {
    pub action_type: ActionType,
    pub target: String,
    pub reason: String,
    pub triggered_by: String,
}

/// Maps an incident to the action that addresses it, or None when the
/// incident kind is informational and has no automated response.
///
/// An operator can force a specific action by writing `override_action`
/// into the incident details; such attempts are audited as manual.
pub fn plan_for(
    incident: &Incident,
    service: &ServiceConfig,
    config: &RemediationConfig,
) -> Option<ActionPlan> {
    if let Some(raw) = incident
        .details
        .get("override_action")
        .and_then(|value| value.as_str())
    {
        match ActionType::parse(raw) {
            Some(action_type) if action_type != ActionType::Manual => {
                return Some(ActionPlan {
                    target: target_for(action_type, service),
                    action_type,
                    reason: format!("override:{}", raw),
                    triggered_by: "manual".to_string(),
                });
            }
            _ => {
                log::warn!(
                    "override_action_ignored service={} incident_id={} raw={}",
                    incident.service,
                    incident.id,
                    raw
                );
            }
        }
    }

    let (action_type, reason) = match incident.kind {
        FindingKind::HealthCheckFailed => (ActionType::RestartContainer, "health_check_failed"),
        FindingKind::CpuSpike => (ActionType::RestartContainer, "cpu_spike"),
        FindingKind::HighResponseTime => (ActionType::RestartContainer, "high_response_time"),
        FindingKind::MemoryLeak => (ActionType::RestartContainer, "memory_leak"),
        FindingKind::HighErrorRate => (error_rate_action(service, config), "high_error_rate"),
        // Advisories are routed to humans, never acted on automatically.
        FindingKind::ExternalAdvisory => return None,
    };

    Some(ActionPlan {
        target: target_for(action_type, service),
        action_type,
        reason: reason.to_string(),
        triggered_by: "bot".to_string(),
    })
}

fn error_rate_action(service: &ServiceConfig, config: &RemediationConfig) -> ActionType {
    match config.error_rate_action.as_str() {
        "scale_up" if service.scale_target.is_some() => ActionType::ScaleUp,
        "scale_up" => {
            log::warn!(
                "scale_up_unavailable service={} falling back to restart (no scale_target)",
                service.name
            );
            ActionType::RestartContainer
        }
        _ => ActionType::RestartContainer,
    }
}

fn target_for(action_type: ActionType, service: &ServiceConfig) -> String {
    match action_type {
        ActionType::ScaleUp | ActionType::ScaleDown => service
            .scale_target
            .clone()
            .unwrap_or_else(|| service.restart_target().to_string()),
        _ => service.restart_target().to_string(),
    }
}
