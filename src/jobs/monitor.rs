use chrono::Utc;
use tokio::time::{Duration, sleep};

use crate::app_context::AppContext;

pub(super) fn start_monitor_job(app_context: AppContext) {
    tokio::spawn(async move {
        if app_context.config.simulation.enabled {
            log::warn!(
                "simulation_mode_enabled profile={}",
                app_context.config.simulation.profile
            );
        }
        let mut previous_tick = None;

        loop {
            let runtime_config = app_context.runtime_config.read().await.clone();
            let now = Utc::now();

            if let Some(previous) = previous_tick {
                let elapsed_secs = now.signed_duration_since(previous).num_seconds().max(0);
                let threshold_secs = (runtime_config.monitor_interval * 2) as i64;
                if elapsed_secs > threshold_secs {
                    log::warn!(
                        "monitor_loop_delayed elapsed_secs={} threshold_secs={}",
                        elapsed_secs,
                        threshold_secs
                    );
                }
            }

            previous_tick = Some(now);

            {
                let mut tick = app_context.last_monitor_tick.lock().await;
                *tick = Some(now);
            }

            app_context.engine.run_tick(&runtime_config, now).await;

            let sleep_duration = Duration::from_secs(runtime_config.monitor_interval);
            tokio::select! {
                _ = sleep(sleep_duration) => {}
                _ = app_context.runtime_update_notify.notified() => {
                    log::info!(
                        "monitor_interval_change_interrupt_applied previous_sleep_secs={}",
                        runtime_config.monitor_interval
                    );
                }
            }
        }
    });
}
