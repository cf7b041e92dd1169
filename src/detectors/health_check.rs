use chrono::{DateTime, Utc};
use serde_json::json;

use crate::config::Thresholds;
use crate::metrics::ServiceSnapshot;

use super::finding::{Finding, FindingKind, Severity};

pub(super) fn evaluate(
    snapshot: &ServiceSnapshot,
    _thresholds: &Thresholds,
    now: DateTime<Utc>,
) -> Option<Finding> {
    let server_error = snapshot.http_status.is_some_and(|status| status >= 500);
    if snapshot.reachable && !server_error {
        return None;
    }

    let reason = snapshot
        .failure_reason
        .clone()
        .unwrap_or_else(|| "health_endpoint_unreachable".to_string());

    Some(Finding {
        service: snapshot.service.clone(),
        kind: FindingKind::HealthCheckFailed,
        severity: Severity::Critical,
        evidence: json!({
            "reason": reason,
            "http_status": snapshot.http_status,
        }),
        observed_at: now,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::evaluate;
    use crate::config::Thresholds;
    use crate::detectors::{FindingKind, Severity};
    use crate::metrics::ServiceSnapshot;

    #[test]
    fn unreachable_service_is_critical() {
        let now = Utc::now();
        let snapshot = ServiceSnapshot::unreachable("ar_app", "connection_refused", now);

        let finding = evaluate(&snapshot, &Thresholds::default(), now).expect("finding");
        assert_eq!(finding.kind, FindingKind::HealthCheckFailed);
        assert_eq!(finding.severity, Severity::Critical);
        assert_eq!(finding.evidence["reason"], "connection_refused");
    }

    #[test]
    fn server_error_status_is_critical() {
        let now = Utc::now();
        let mut snapshot = ServiceSnapshot::healthy("ar_app", now);
        snapshot.http_status = Some(503);

        let finding = evaluate(&snapshot, &Thresholds::default(), now).expect("finding");
        assert_eq!(finding.severity, Severity::Critical);
    }

    #[test]
    fn healthy_service_yields_nothing() {
        let now = Utc::now();
        let snapshot = ServiceSnapshot::healthy("ar_app", now);
        assert!(evaluate(&snapshot, &Thresholds::default(), now).is_none());
    }
}
