use std::path::Path;

use notify::{Config as NotifyConfig, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::app_context::AppContext;
use crate::config::{Config, RuntimeConfig};

fn is_config_change(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Any
    )
}

/// Reloads from disk and swaps the runtime snapshot. An invalid file leaves
/// the running configuration untouched.
async fn apply_runtime_reload(app_context: &AppContext) -> Result<RuntimeConfig, String> {
    let config = Config::load(&app_context.config_path).map_err(|error| error.to_string())?;
    let runtime_config = RuntimeConfig::from_config(&config);
    app_context
        .update_runtime_config(runtime_config.clone())
        .await;
    Ok(runtime_config)
}

pub(super) fn start_config_hot_reload_job(app_context: AppContext) {
    tokio::spawn(async move {
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut watcher = match RecommendedWatcher::new(
            move |result| {
                let _ = tx.send(result);
            },
            NotifyConfig::default(),
        ) {
            Ok(watcher) => watcher,
            Err(error) => {
                log::warn!(
                    "config_hot_reload_disabled reason=watcher_init_failed error={}",
                    error
                );
                return;
            }
        };
        if let Err(error) = watcher.watch(
            Path::new(app_context.config_path.as_str()),
            RecursiveMode::NonRecursive,
        ) {
            log::warn!(
                "config_hot_reload_disabled reason=watch_failed path={} error={}",
                app_context.config_path,
                error
            );
            return;
        }

        while let Some(event_result) = rx.recv().await {
            let relevant = match event_result {
                Ok(event) => is_config_change(&event.kind),
                Err(error) => {
                    log::warn!("config_watch_error error={}", error);
                    false
                }
            };
            if !relevant {
                continue;
            }

            // Editors emit a burst of events per save; drain the backlog and
            // reload once.
            while rx.try_recv().is_ok() {}

            match apply_runtime_reload(&app_context).await {
                Ok(runtime_config) => {
                    log::info!(
                        "config_hot_reload_applied monitor_interval={} error_rate={} cpu_percent={} response_time_ms={} dedupe_secs={} max_actions_per_window={} window_seconds={} failure_threshold={} cooldown_seconds={}",
                        runtime_config.monitor_interval,
                        runtime_config.thresholds.error_rate,
                        runtime_config.thresholds.cpu_percent,
                        runtime_config.thresholds.response_time_ms,
                        runtime_config.incidents.dedupe_secs,
                        runtime_config.remediation.max_actions_per_window,
                        runtime_config.remediation.window_seconds,
                        runtime_config.breaker.failure_threshold,
                        runtime_config.breaker.cooldown_seconds,
                    );
                }
                Err(error) => {
                    log::warn!("config_hot_reload_rejected error={}", error);
                }
            }
        }
    });
}
