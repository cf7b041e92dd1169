mod app_context;
mod breaker;
mod config;
mod detectors;
mod engine;
mod incidents;
mod jobs;
mod metrics;
mod notifications;
mod rate_limit;
mod remediation;
mod store;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::app_context::AppContext;
use crate::config::Config;
use crate::engine::Engine;
use crate::jobs::start_background_jobs;
use crate::metrics::ActiveMetricsProvider;
use crate::notifications::Notifier;
use crate::remediation::ActiveLifecycleProvider;
use crate::store::Store;

fn init_json_logging() {
    if let Err(error) = tracing_log::LogTracer::init() {
        eprintln!(
            "logging bridge initialization failed (continuing with existing logger): {}",
            error
        );
    }

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .json()
        .with_current_span(false)
        .with_span_list(false)
        .finish();

    if let Err(error) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("global logger initialization failed: {}", error);
    }
}

const CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() {
    init_json_logging();

    let config = match Config::load(CONFIG_PATH) {
        Ok(config) => config,
        Err(error) => {
            log::error!("Configuration error: {}", error);
            return;
        }
    };

    log::info!(
        "remedybot_starting services={} monitor_interval={}",
        config.services.len(),
        config.monitor_interval
    );

    let store = match Store::open_from_config(&config.store) {
        Ok(store) => store,
        Err(error) => {
            log::error!("store_open_failed path={} error={}", config.store.path, error);
            return;
        }
    };

    let notifier = Notifier::from_config(&config.notifications);
    let metrics = Arc::new(ActiveMetricsProvider::new(config.simulation.enabled));
    let lifecycle = Arc::new(ActiveLifecycleProvider::new(config.simulation.enabled));
    let engine = Engine::new(
        store.clone(),
        metrics,
        lifecycle,
        notifier.clone(),
        config.services.clone(),
        config.monitor_interval,
    );

    let app_context = AppContext::new(config, CONFIG_PATH, store, engine);
    start_background_jobs(app_context);

    match tokio::signal::ctrl_c().await {
        Ok(()) => log::info!("shutdown_signal_received"),
        Err(error) => log::error!("shutdown_signal_error error={}", error),
    }
}
