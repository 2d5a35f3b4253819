//! Configuration for rtcache.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::cache::KeyEncoding;
use crate::RuntimeCacheResult;

/// Default configuration file name.
pub const CONFIG_FILE: &str = "rtcache.toml";

/// Main configuration for rtcache.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

/// Runtime cache settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheConfig {
    /// How keys are normalized to strings.
    #[serde(default)]
    pub key_encoding: KeyEncoding,

    /// Count hits, misses and producer failures.
    #[serde(default = "default_true")]
    pub track_stats: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            key_encoding: KeyEncoding::default(),
            track_stats: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> RuntimeCacheResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to a TOML file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> RuntimeCacheResult<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Checks values serde cannot restrict on its own.
    pub fn validate(&self) -> RuntimeCacheResult<()> {
        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.general.log_level.as_str()) {
            return Err(crate::RuntimeCacheError::config(format!(
                "unknown log level '{}'",
                self.general.log_level
            )));
        }
        if !matches!(self.general.log_format.as_str(), "text" | "json") {
            return Err(crate::RuntimeCacheError::config(format!(
                "unknown log format '{}'",
                self.general.log_format
            )));
        }
        Ok(())
    }
}
