mod cpu_spike;
mod error_rate;
mod finding;
mod health_check;
mod latency;

use chrono::{DateTime, Utc};

use crate::config::Thresholds;
use crate::metrics::ServiceSnapshot;

pub use finding::{Finding, FindingKind, Severity};

/// Runs every detector against the current snapshot. Detectors are pure and
/// independent; a tick may produce zero, one, or several findings.
pub fn run_all(
    snapshot: &ServiceSnapshot,
    history: &[ServiceSnapshot],
    thresholds: &Thresholds,
    now: DateTime<Utc>,
) -> Vec<Finding> {
    let mut findings = Vec::new();

    if let Some(finding) = health_check::evaluate(snapshot, thresholds, now) {
        findings.push(finding);
    }
    if let Some(finding) = error_rate::evaluate(snapshot, thresholds, now) {
        findings.push(finding);
    }
    if let Some(finding) = cpu_spike::evaluate(snapshot, history, thresholds, now) {
        findings.push(finding);
    }
    if let Some(finding) = latency::evaluate(snapshot, thresholds, now) {
        findings.push(finding);
    }

    findings
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{FindingKind, run_all};
    use crate::config::Thresholds;
    use crate::metrics::ServiceSnapshot;

    #[test]
    fn healthy_snapshot_produces_no_findings() {
        let now = Utc::now();
        let snapshot = ServiceSnapshot::healthy("ar_app", now);
        assert!(run_all(&snapshot, &[], &Thresholds::default(), now).is_empty());
    }

    #[test]
    fn degraded_snapshot_produces_multiple_findings() {
        let now = Utc::now();
        let mut snapshot = ServiceSnapshot::healthy("ar_app", now);
        snapshot.error_rate = 0.5;
        snapshot.cpu_percent = 95.0;
        snapshot.p95_ms = Some(2000);

        let findings = run_all(&snapshot, &[], &Thresholds::default(), now);
        let kinds: Vec<FindingKind> = findings.iter().map(|finding| finding.kind).collect();
        assert_eq!(
            kinds,
            vec![
                FindingKind::HighErrorRate,
                FindingKind::CpuSpike,
                FindingKind::HighResponseTime,
            ]
        );
    }

    #[test]
    fn unreachable_snapshot_produces_only_health_finding() {
        let now = Utc::now();
        let snapshot = ServiceSnapshot::unreachable("ar_app", "timeout", now);

        let findings = run_all(&snapshot, &[], &Thresholds::default(), now);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::HealthCheckFailed);
    }
}
