use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, Notify, RwLock};

use crate::config::{Config, RuntimeConfig};
use crate::engine::Engine;
use crate::store::Store;

#[derive(Clone)]
pub struct AppContext {
    pub config: Config,
    pub config_path: String,
    pub runtime_config: Arc<RwLock<RuntimeConfig>>,
    pub runtime_update_notify: Arc<Notify>,
    pub store: Store,
    pub engine: Arc<Engine>,
    pub last_monitor_tick: Arc<Mutex<Option<DateTime<Utc>>>>,
}

impl AppContext {
    pub fn new(config: Config, config_path: &str, store: Store, engine: Arc<Engine>) -> Self {
        let runtime_config = RuntimeConfig::from_config(&config);
        Self {
            config,
            config_path: config_path.to_string(),
            runtime_config: Arc::new(RwLock::new(runtime_config)),
            runtime_update_notify: Arc::new(Notify::new()),
            store,
            engine,
            last_monitor_tick: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn update_runtime_config(&self, runtime_config: RuntimeConfig) {
        {
            let mut slot = self.runtime_config.write().await;
            *slot = runtime_config;
        }
        self.runtime_update_notify.notify_waiters();
    }
}
