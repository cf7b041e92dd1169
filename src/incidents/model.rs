use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::detectors::{FindingKind, Severity};

/// Deduplicated, lifecycle-tracked record of a problem. At most one ACTIVE
/// incident exists per (service, kind) at any time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    pub id: u64,
    pub uuid: String,
    pub service: String,
    pub kind: FindingKind,
    pub severity: Severity,
    pub status: IncidentStatus,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
    /// Timestamp of the newest finding merged into this incident.
    pub last_seen_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolution_secs: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IncidentStatus {
    Active,
    Resolved,
    Escalated,
}

impl IncidentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentStatus::Active => "ACTIVE",
            IncidentStatus::Resolved => "RESOLVED",
            IncidentStatus::Escalated => "ESCALATED",
        }
    }
}

impl std::fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
