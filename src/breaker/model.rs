use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted circuit-breaker record, one per service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakerState {
    pub mode: BreakerMode,
    pub failure_count: u32,
    pub success_count: u32,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub opened_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
}

impl Default for BreakerState {
    fn default() -> Self {
        Self {
            mode: BreakerMode::Closed,
            failure_count: 0,
            success_count: 0,
            last_failure_at: None,
            opened_at: None,
            last_success_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BreakerMode {
    #[serde(rename = "CLOSED")]
    Closed,
    #[serde(rename = "OPEN")]
    Open,
    #[serde(rename = "HALF_OPEN")]
    HalfOpen,
}

impl BreakerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BreakerMode::Closed => "CLOSED",
            BreakerMode::Open => "OPEN",
            BreakerMode::HalfOpen => "HALF_OPEN",
        }
    }
}

impl std::fmt::Display for BreakerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transition emitted by the state machine, surfaced to the notification
/// sink by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerEvent {
    Opened,
    Reopened,
    Closed,
}
