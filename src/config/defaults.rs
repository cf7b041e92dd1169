use super::schema::{
    BreakerConfig, IncidentsConfig, NotificationsConfig, RemediationConfig, Simulation,
    StoreConfig, Thresholds,
};

pub(super) fn default_monitor_interval() -> u64 {
    5
}

pub(super) fn default_error_rate() -> f64 {
    0.2
}

pub(super) fn default_error_rate_critical() -> f64 {
    0.4
}

pub(super) fn default_cpu_percent() -> f64 {
    80.0
}

pub(super) fn default_cpu_sustained_ticks() -> u32 {
    3
}

pub(super) fn default_response_time_ms() -> u64 {
    500
}

pub(super) fn default_dedupe_secs() -> u64 {
    60
}

pub(super) fn default_max_actions_per_window() -> u32 {
    3
}

pub(super) fn default_window_seconds() -> u64 {
    300
}

pub(super) fn default_action_timeout_secs() -> u64 {
    10
}

pub(super) fn default_attempt_grace_secs() -> u64 {
    60
}

pub(super) fn default_error_rate_action() -> String {
    "restart_container".to_string()
}

pub(super) fn default_failure_threshold() -> u32 {
    3
}

pub(super) fn default_success_threshold() -> u32 {
    1
}

pub(super) fn default_cooldown_seconds() -> u64 {
    120
}

pub(super) fn default_webhook_timeout_secs() -> u64 {
    5
}

pub(super) fn default_console_enabled() -> bool {
    true
}

pub(super) fn default_store_path() -> String {
    "data/remedybot".to_string()
}

pub(super) fn default_simulation_profile() -> String {
    "wave".to_string()
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            error_rate: default_error_rate(),
            error_rate_critical: default_error_rate_critical(),
            cpu_percent: default_cpu_percent(),
            cpu_sustained_ticks: default_cpu_sustained_ticks(),
            response_time_ms: default_response_time_ms(),
        }
    }
}

impl Default for IncidentsConfig {
    fn default() -> Self {
        Self {
            dedupe_secs: default_dedupe_secs(),
        }
    }
}

impl Default for RemediationConfig {
    fn default() -> Self {
        Self {
            max_actions_per_window: default_max_actions_per_window(),
            window_seconds: default_window_seconds(),
            action_timeout_secs: default_action_timeout_secs(),
            attempt_grace_secs: default_attempt_grace_secs(),
            error_rate_action: default_error_rate_action(),
        }
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            success_threshold: default_success_threshold(),
            cooldown_seconds: default_cooldown_seconds(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            webhook_timeout_secs: default_webhook_timeout_secs(),
            console: default_console_enabled(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            enabled: false,
            profile: default_simulation_profile(),
        }
    }
}
