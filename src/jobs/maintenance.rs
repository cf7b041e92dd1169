use chrono::{Duration as ChronoDuration, Utc};
use tokio::time::{Duration, sleep};

use crate::app_context::AppContext;

const MAINTENANCE_INTERVAL_SECS: u64 = 3600;

/// Hourly cleanup of rate-limit window entries that have aged out of every
/// possible window. The limiter already ignores stale entries; this only
/// keeps the tree from growing without bound.
pub(super) fn start_maintenance_job(app_context: AppContext) {
    tokio::spawn(async move {
        loop {
            sleep(Duration::from_secs(MAINTENANCE_INTERVAL_SECS)).await;

            let runtime_config = app_context.runtime_config.read().await.clone();
            let retention_secs = runtime_config
                .remediation
                .window_seconds
                .max(MAINTENANCE_INTERVAL_SECS);
            let cutoff = Utc::now() - ChronoDuration::seconds(retention_secs as i64);

            match app_context.store.prune_window_before(cutoff) {
                Ok(removed) if removed > 0 => {
                    log::info!("action_window_pruned removed={}", removed);
                }
                Ok(_) => {}
                Err(error) => {
                    log::warn!("action_window_prune_failed error={}", error);
                }
            }
        }
    });
}
