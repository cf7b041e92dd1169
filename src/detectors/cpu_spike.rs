use chrono::{DateTime, Utc};
use serde_json::json;

use crate::config::Thresholds;
use crate::metrics::ServiceSnapshot;

use super::finding::{Finding, FindingKind, Severity};

/// A breach in a single tick is a warning; a breach sustained across
/// `cpu_sustained_ticks` consecutive snapshots (including the current one)
/// escalates to critical.
pub(super) fn evaluate(
    snapshot: &ServiceSnapshot,
    history: &[ServiceSnapshot],
    thresholds: &Thresholds,
    now: DateTime<Utc>,
) -> Option<Finding> {
    if !snapshot.reachable {
        return None;
    }
    if snapshot.cpu_percent <= thresholds.cpu_percent {
        return None;
    }

    let needed_prior = thresholds.cpu_sustained_ticks.saturating_sub(1) as usize;
    let sustained = needed_prior == 0
        || (history.len() >= needed_prior
            && history
                .iter()
                .rev()
                .take(needed_prior)
                .all(|prior| prior.reachable && prior.cpu_percent > thresholds.cpu_percent));

    let severity = if sustained {
        Severity::Critical
    } else {
        Severity::Warning
    };

    Some(Finding {
        service: snapshot.service.clone(),
        kind: FindingKind::CpuSpike,
        severity,
        evidence: json!({
            "cpu_usage_percent": snapshot.cpu_percent,
            "threshold": thresholds.cpu_percent,
            "sustained_ticks": thresholds.cpu_sustained_ticks,
            "sustained": sustained,
        }),
        observed_at: now,
    })
}
