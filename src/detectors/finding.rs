use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single detector's momentary judgment that a threshold is breached.
/// Findings are consumed by the incident manager within the same tick and
/// never persisted directly.
#[derive(Debug, Clone)]
pub struct Finding {
    pub service: String,
    pub kind: FindingKind,
    pub severity: Severity,
    pub evidence: serde_json::Value,
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    HealthCheckFailed,
    HighErrorRate,
    CpuSpike,
    HighResponseTime,
    MemoryLeak,
    ExternalAdvisory,
}

impl FindingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingKind::HealthCheckFailed => "health_check_failed",
            FindingKind::HighErrorRate => "high_error_rate",
            FindingKind::CpuSpike => "cpu_spike",
            FindingKind::HighResponseTime => "high_response_time",
            FindingKind::MemoryLeak => "memory_leak",
            FindingKind::ExternalAdvisory => "external_advisory",
        }
    }
}

impl std::fmt::Display for FindingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
