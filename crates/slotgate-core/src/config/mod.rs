//! Configuration schemas.
//!
//! All configuration structs are deserialized via the `config` crate from an
//! optional TOML file layered with `SLOTGATE__*` environment variables.

pub mod limit;
pub mod logging;
pub mod store;
pub mod sweeper;

use serde::{Deserialize, Serialize};

use self::limit::LimitConfig;
use self::logging::LoggingConfig;
use self::store::StoreConfig;
use self::sweeper::SweeperConfig;

use crate::error::GateError;
use crate::types::LimitDescriptor;

/// Root configuration for the Slotgate binaries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GateConfig {
    /// Store backend settings.
    #[serde(default)]
    pub store: StoreConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Stale lock sweeper settings.
    #[serde(default)]
    pub sweeper: SweeperConfig,
    /// Concurrency groups known to the operator tooling.
    #[serde(default)]
    pub limits: Vec<LimitConfig>,
}

impl GateConfig {
    /// Load configuration from `path` (extension optional, file may be absent)
    /// and environment variables prefixed with `SLOTGATE__`.
    pub fn load(path: &str) -> Result<Self, GateError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("SLOTGATE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| GateError::configuration(format!("Failed to build config: {e}")))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| GateError::configuration(format!("Failed to deserialize config: {e}")))?;

        for limit in &config.limits {
            limit.to_descriptor().validate()?;
        }

        Ok(config)
    }

    /// Descriptors for every configured group.
    pub fn descriptors(&self) -> Vec<LimitDescriptor> {
        self.limits.iter().map(LimitConfig::to_descriptor).collect()
    }

    /// Find the configured group with the given key.
    pub fn find_limit(&self, key: &str) -> Option<LimitDescriptor> {
        self.limits
            .iter()
            .find(|l| l.key == key)
            .map(LimitConfig::to_descriptor)
    }
}
