use chrono::{DateTime, Duration, Utc};

use crate::config::RemediationConfig;
use crate::remediation::ActionType;
use crate::store::{Store, StoreError};

/// Fixed-window frequency cap on remediation attempts per
/// (service, action_type). Counts every attempt, successful or not, and is
/// deliberately independent of the circuit breaker: the breaker reacts to
/// failure patterns, this caps raw frequency.
#[derive(Clone)]
pub struct RateLimiter {
    store: Store,
}

impl RateLimiter {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn allow(
        &self,
        service: &str,
        action_type: ActionType,
        config: &RemediationConfig,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let cutoff = now - Duration::seconds(config.window_seconds as i64);
        let count = self.store.count_actions_since(service, action_type, cutoff)?;
        if count >= config.max_actions_per_window {
            log::warn!(
                "rate_limit_exceeded service={} action={} count={} max={} window_secs={}",
                service,
                action_type,
                count,
                config.max_actions_per_window,
                config.window_seconds
            );
            return Ok(false);
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::RateLimiter;
    use crate::config::RemediationConfig;
    use crate::remediation::ActionType;
    use crate::store::Store;

    fn test_config() -> RemediationConfig {
        RemediationConfig {
            max_actions_per_window: 3,
            window_seconds: 300,
            ..RemediationConfig::default()
        }
    }

    #[test]
    fn fourth_attempt_in_window_is_rejected() {
        let temp = tempfile::tempdir().expect("temp dir");
        let store = Store::open(&temp.path().to_string_lossy()).expect("open store");
        let limiter = RateLimiter::new(store.clone());
        let config = test_config();
        let now = Utc::now();

        for offset in [250, 150, 50] {
            store
                .append_window_entry(
                    "ar_app",
                    ActionType::RestartContainer,
                    now - Duration::seconds(offset),
                    // Success does not matter; attempts count either way.
                    offset == 150,
                )
                .expect("append entry");
        }

        let allowed = limiter
            .allow("ar_app", ActionType::RestartContainer, &config, now)
            .expect("allow");
        assert!(!allowed);
    }

    #[test]
    fn entries_outside_window_do_not_count() {
        let temp = tempfile::tempdir().expect("temp dir");
        let store = Store::open(&temp.path().to_string_lossy()).expect("open store");
        let limiter = RateLimiter::new(store.clone());
        let config = test_config();
        let now = Utc::now();

        for offset in [400, 350, 310] {
            store
                .append_window_entry(
                    "ar_app",
                    ActionType::RestartContainer,
                    now - Duration::seconds(offset),
                    false,
                )
                .expect("append entry");
        }

        let allowed = limiter
            .allow("ar_app", ActionType::RestartContainer, &config, now)
            .expect("allow");
        assert!(allowed);
    }

    #[test]
    fn limit_is_scoped_to_service_and_action() {
        let temp = tempfile::tempdir().expect("temp dir");
        let store = Store::open(&temp.path().to_string_lossy()).expect("open store");
        let limiter = RateLimiter::new(store.clone());
        let config = test_config();
        let now = Utc::now();

        for _ in 0..3 {
            store
                .append_window_entry("ar_app", ActionType::RestartContainer, now, true)
                .expect("append entry");
        }

        assert!(
            !limiter
                .allow("ar_app", ActionType::RestartContainer, &config, now)
                .expect("restart blocked")
        );
        assert!(
            limiter
                .allow("ar_app", ActionType::ScaleUp, &config, now)
                .expect("other action allowed")
        );
        assert!(
            limiter
                .allow("ar_app_replica", ActionType::RestartContainer, &config, now)
                .expect("other service allowed")
        );
    }
}
