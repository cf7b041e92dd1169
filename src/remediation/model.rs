use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Append-only audit record of one remediation attempt, written whether the
/// attempt succeeded or failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemediationAction {
    pub id: u64,
    pub uuid: String,
    pub incident_id: u64,
    pub service: String,
    pub action_type: ActionType,
    pub target: String,
    pub success: bool,
    pub error: Option<String>,
    pub execution_time_ms: u64,
    pub triggered_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    RestartContainer,
    ScaleUp,
    ScaleDown,
    Heal,
    Manual,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::RestartContainer => "restart_container",
            ActionType::ScaleUp => "scale_up",
            ActionType::ScaleDown => "scale_down",
            ActionType::Heal => "heal",
            ActionType::Manual => "manual",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "restart_container" => Some(ActionType::RestartContainer),
            "scale_up" => Some(ActionType::ScaleUp),
            "scale_down" => Some(ActionType::ScaleDown),
            "heal" => Some(ActionType::Heal),
            "manual" => Some(ActionType::Manual),
            _ => None,
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
