use serde_json::json;

use crate::detectors::Severity;
use crate::incidents::Incident;
use crate::remediation::RemediationAction;

/// Terminal events pushed outward. Delivery is fire-and-forget; the
/// orchestration loop never waits on a sink.
#[derive(Debug, Clone)]
pub enum NotificationEvent {
    IncidentCreated {
        incident: Incident,
    },
    IncidentResolved {
        incident: Incident,
    },
    IncidentEscalated {
        incident: Incident,
        reason: String,
    },
    RemediationSucceeded {
        action: RemediationAction,
    },
    RemediationFailed {
        action: RemediationAction,
    },
    CircuitOpened {
        service: String,
        failure_count: u32,
    },
}

impl NotificationEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            NotificationEvent::IncidentCreated { .. } => "incident_created",
            NotificationEvent::IncidentResolved { .. } => "incident_resolved",
            NotificationEvent::IncidentEscalated { .. } => "incident_escalated",
            NotificationEvent::RemediationSucceeded { .. } => "remediation_succeeded",
            NotificationEvent::RemediationFailed { .. } => "remediation_failed",
            NotificationEvent::CircuitOpened { .. } => "circuit_opened",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            NotificationEvent::IncidentCreated { incident } => incident.severity,
            NotificationEvent::IncidentResolved { .. } => Severity::Info,
            NotificationEvent::IncidentEscalated { .. } => Severity::Critical,
            NotificationEvent::RemediationSucceeded { .. } => Severity::Info,
            NotificationEvent::RemediationFailed { .. } => Severity::Critical,
            NotificationEvent::CircuitOpened { .. } => Severity::Warning,
        }
    }

    pub fn message(&self) -> String {
        match self {
            NotificationEvent::IncidentCreated { incident } => format!(
                "Incident detected on {}: {} ({})",
                incident.service, incident.kind, incident.severity
            ),
            NotificationEvent::IncidentResolved { incident } => format!(
                "Incident resolved on {}: {} after {}s",
                incident.service,
                incident.kind,
                incident.resolution_secs.unwrap_or(0)
            ),
            NotificationEvent::IncidentEscalated { incident, reason } => format!(
                "ESCALATION REQUIRED for {}: {} - auto-remediation exhausted ({})",
                incident.service, incident.kind, reason
            ),
            NotificationEvent::RemediationSucceeded { action } => format!(
                "Remediation successful: {} on {} ({}ms)",
                action.action_type, action.target, action.execution_time_ms
            ),
            NotificationEvent::RemediationFailed { action } => format!(
                "Remediation failed: {} on {} - {}",
                action.action_type,
                action.target,
                action.error.as_deref().unwrap_or("unknown error")
            ),
            NotificationEvent::CircuitOpened {
                service,
                failure_count,
            } => format!(
                "Circuit breaker OPEN for {} after {} consecutive failures",
                service, failure_count
            ),
        }
    }

    /// Webhook payload. Flat on purpose so generic sinks can route on
    /// `event` and `severity` without knowing our internals.
    pub fn payload(&self) -> serde_json::Value {
        let mut payload = json!({
            "event": self.kind(),
            "severity": self.severity().as_str(),
            "message": self.message(),
        });

        let extra = match self {
            NotificationEvent::IncidentCreated { incident }
            | NotificationEvent::IncidentResolved { incident } => json!({
                "service": incident.service,
                "incident_uuid": incident.uuid,
                "incident_kind": incident.kind.as_str(),
            }),
            NotificationEvent::IncidentEscalated { incident, reason } => json!({
                "service": incident.service,
                "incident_uuid": incident.uuid,
                "incident_kind": incident.kind.as_str(),
                "reason": reason,
            }),
            NotificationEvent::RemediationSucceeded { action }
            | NotificationEvent::RemediationFailed { action } => json!({
                "service": action.service,
                "action_uuid": action.uuid,
                "action_type": action.action_type.as_str(),
                "target": action.target,
                "execution_time_ms": action.execution_time_ms,
            }),
            NotificationEvent::CircuitOpened {
                service,
                failure_count,
            } => json!({
                "service": service,
                "failure_count": failure_count,
            }),
        };

        if let (Some(base), Some(extra)) = (payload.as_object_mut(), extra.as_object()) {
            for (key, value) in extra {
                base.insert(key.clone(), value.clone());
            }
        }
        payload
    }
}
