use chrono::{DateTime, Utc};
use serde_json::json;

use crate::config::Thresholds;
use crate::metrics::ServiceSnapshot;

use super::finding::{Finding, FindingKind, Severity};

pub(super) fn evaluate(
    snapshot: &ServiceSnapshot,
    thresholds: &Thresholds,
    now: DateTime<Utc>,
) -> Option<Finding> {
    if !snapshot.reachable {
        return None;
    }
    if snapshot.error_rate <= thresholds.error_rate {
        return None;
    }

    let severity = if snapshot.error_rate > thresholds.error_rate_critical {
        Severity::Critical
    } else {
        Severity::Warning
    };

    Some(Finding {
        service: snapshot.service.clone(),
        kind: FindingKind::HighErrorRate,
        severity,
        evidence: json!({
            "error_rate": snapshot.error_rate,
            "threshold": thresholds.error_rate,
            "critical_threshold": thresholds.error_rate_critical,
            "total_requests": snapshot.requests,
            "total_errors": snapshot.errors,
        }),
        observed_at: now,
    })
}
