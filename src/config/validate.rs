use thiserror::Error;

use super::schema::Config;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Validation(String),
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.monitor_interval == 0 {
            return Err(ConfigError::Validation(
                "monitor_interval must be greater than 0".to_string(),
            ));
        }
        if self.services.is_empty() {
            return Err(ConfigError::Validation(
                "at least one [[services]] entry is required".to_string(),
            ));
        }
        for service in &self.services {
            if service.name.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "services.name must not be empty".to_string(),
                ));
            }
            if !self.simulation.enabled && service.metrics_url.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "services.metrics_url must not be empty for {} unless simulation is enabled",
                    service.name
                )));
            }
        }

        validate_rate("thresholds.error_rate", self.thresholds.error_rate)?;
        validate_rate(
            "thresholds.error_rate_critical",
            self.thresholds.error_rate_critical,
        )?;
        if self.thresholds.error_rate_critical < self.thresholds.error_rate {
            return Err(ConfigError::Validation(
                "thresholds.error_rate_critical must not be below thresholds.error_rate"
                    .to_string(),
            ));
        }
        if self.thresholds.cpu_percent.is_nan()
            || !(0.0..=100.0).contains(&self.thresholds.cpu_percent)
        {
            return Err(ConfigError::Validation(
                "thresholds.cpu_percent must be between 0 and 100".to_string(),
            ));
        }
        if self.thresholds.cpu_sustained_ticks == 0 {
            return Err(ConfigError::Validation(
                "thresholds.cpu_sustained_ticks must be greater than 0".to_string(),
            ));
        }
        if self.thresholds.response_time_ms == 0 {
            return Err(ConfigError::Validation(
                "thresholds.response_time_ms must be greater than 0".to_string(),
            ));
        }

        if self.remediation.max_actions_per_window == 0 {
            return Err(ConfigError::Validation(
                "remediation.max_actions_per_window must be greater than 0".to_string(),
            ));
        }
        if self.remediation.window_seconds == 0 {
            return Err(ConfigError::Validation(
                "remediation.window_seconds must be greater than 0".to_string(),
            ));
        }
        if self.remediation.action_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "remediation.action_timeout_secs must be greater than 0".to_string(),
            ));
        }
        match self.remediation.error_rate_action.as_str() {
            "restart_container" | "scale_up" => {}
            other => {
                return Err(ConfigError::Validation(format!(
                    "remediation.error_rate_action must be restart_container or scale_up, got {}",
                    other
                )));
            }
        }

        if self.breaker.failure_threshold == 0 {
            return Err(ConfigError::Validation(
                "breaker.failure_threshold must be greater than 0".to_string(),
            ));
        }
        if self.breaker.success_threshold == 0 {
            return Err(ConfigError::Validation(
                "breaker.success_threshold must be greater than 0".to_string(),
            ));
        }
        if self.breaker.cooldown_seconds == 0 {
            return Err(ConfigError::Validation(
                "breaker.cooldown_seconds must be greater than 0".to_string(),
            ));
        }

        if self.notifications.webhook_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "notifications.webhook_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if let Some(url) = &self.notifications.webhook_url
            && url.trim().is_empty()
        {
            return Err(ConfigError::Validation(
                "notifications.webhook_url must not be empty when set".to_string(),
            ));
        }

        if self.store.path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "store.path must not be empty".to_string(),
            ));
        }

        if self.simulation.profile.trim().is_empty() {
            return Err(ConfigError::Validation(
                "simulation.profile must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

fn validate_rate(field: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_nan() || !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::Validation(format!(
            "{} must be between 0.0 and 1.0",
            field
        )));
    }
    Ok(())
}
