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
    let p95_ms = snapshot.p95_ms?;
    if p95_ms <= thresholds.response_time_ms {
        return None;
    }

    let severity = if p95_ms > thresholds.response_time_ms * 2 {
        Severity::Critical
    } else {
        Severity::Warning
    };

    Some(Finding {
        service: snapshot.service.clone(),
        kind: FindingKind::HighResponseTime,
        severity,
        evidence: json!({
            "p95_response_time_ms": p95_ms,
            "threshold_ms": thresholds.response_time_ms,
            "p50_ms": snapshot.p50_ms,
            "p99_ms": snapshot.p99_ms,
        }),
        observed_at: now,
    })
}
