use serde::Deserialize;

use super::defaults::*;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_monitor_interval")]
    pub monitor_interval: u64,
    pub services: Vec<ServiceConfig>,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub incidents: IncidentsConfig,
    #[serde(default)]
    pub remediation: RemediationConfig,
    #[serde(default)]
    pub breaker: BreakerConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub simulation: Simulation,
}

/// Hot-reloadable slice of the config, swapped in by the reload job and
/// snapshotted by the monitor loop at the top of each tick.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub monitor_interval: u64,
    pub thresholds: Thresholds,
    pub incidents: IncidentsConfig,
    pub remediation: RemediationConfig,
    pub breaker: BreakerConfig,
}

impl RuntimeConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            monitor_interval: config.monitor_interval,
            thresholds: config.thresholds.clone(),
            incidents: config.incidents.clone(),
            remediation: config.remediation.clone(),
            breaker: config.breaker.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    /// Health endpoint polled once per tick. Ignored in simulation mode.
    #[serde(default)]
    pub metrics_url: String,
    /// Container acted on by restart remediation. Defaults to the service name.
    #[serde(default)]
    pub target: String,
    /// Stopped replica started by scale_up and stopped by scale_down.
    #[serde(default)]
    pub scale_target: Option<String>,
}

impl ServiceConfig {
    pub fn restart_target(&self) -> &str {
        if self.target.is_empty() {
            &self.name
        } else {
            &self.target
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Thresholds {
    #[serde(default = "default_error_rate")]
    pub error_rate: f64,
    #[serde(default = "default_error_rate_critical")]
    pub error_rate_critical: f64,
    #[serde(default = "default_cpu_percent")]
    pub cpu_percent: f64,
    #[serde(default = "default_cpu_sustained_ticks")]
    pub cpu_sustained_ticks: u32,
    #[serde(default = "default_response_time_ms")]
    pub response_time_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncidentsConfig {
    /// After an incident of a given (service, kind) is escalated, repeats of
    /// the same finding within this window merge into it silently instead of
    /// opening a fresh incident.
    #[serde(default = "default_dedupe_secs")]
    pub dedupe_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemediationConfig {
    #[serde(default = "default_max_actions_per_window")]
    pub max_actions_per_window: u32,
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,
    #[serde(default = "default_action_timeout_secs")]
    pub action_timeout_secs: u64,
    /// Incidents with an attempt newer than this are left alone for the tick.
    #[serde(default = "default_attempt_grace_secs")]
    pub attempt_grace_secs: u64,
    #[serde(default = "default_error_rate_action")]
    pub error_rate_action: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BreakerConfig {
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "default_success_threshold")]
    pub success_threshold: u32,
    #[serde(default = "default_cooldown_seconds")]
    pub cooldown_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default = "default_webhook_timeout_secs")]
    pub webhook_timeout_secs: u64,
    #[serde(default = "default_console_enabled")]
    pub console: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Simulation {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_simulation_profile")]
    pub profile: String,
}
