mod defaults;
mod schema;
mod validate;

use std::path::Path;

pub use schema::{
    BreakerConfig, Config, IncidentsConfig, NotificationsConfig, RemediationConfig, RuntimeConfig,
    ServiceConfig, Simulation, StoreConfig, Thresholds,
};
pub use validate::ConfigError;

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&raw, &path.display().to_string())
    }

    /// Parses and validates in one step; `origin` only labels errors.
    pub fn from_toml(raw: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }
}
