//! Validated TOML configuration.
//!
//! The whole surface is enumerated and strict: unknown fields, unknown modes
//! and bad log levels fail at load time instead of surfacing mid-run.

use crate::registry::DeviceRegistry;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::Level;

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid logging level: {0}")]
    InvalidLogLevel(String),
}

/// Operating mode. `passive` decodes and logs but never publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Active,
    Passive,
}

impl Mode {
    pub fn is_active(self) -> bool {
        self == Mode::Active
    }
}

/// Connection parameters for the MQTT sink.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MqttConfig {
    pub enable: bool,
    pub server: String,
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
}

fn default_mqtt_port() -> u16 {
    1883
}

/// Connection parameters for the memcached sink.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemcacheConfig {
    pub enable: bool,
    pub server: String,
    #[serde(default = "default_memcache_port")]
    pub port: u16,
}

fn default_memcache_port() -> u16 {
    11211
}

/// The `[collector]` table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollectorConfig {
    pub mode: Mode,
    #[serde(default = "default_logging")]
    pub logging: String,
    pub mqtt: Option<MqttConfig>,
    pub memcache: Option<MemcacheConfig>,
}

fn default_logging() -> String {
    "info".to_string()
}

/// Full configuration: collector settings plus the device registry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub collector: CollectorConfig,
    #[serde(default)]
    pub devices: DeviceRegistry,
}

impl Config {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::parse(&std::fs::read_to_string(path)?)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(raw)?;
        config.log_level()?;
        Ok(config)
    }

    /// The validated logging level.
    pub fn log_level(&self) -> Result<Level, ConfigError> {
        self.collector
            .logging
            .parse()
            .map_err(|_| ConfigError::InvalidLogLevel(self.collector.logging.clone()))
    }

    pub fn mqtt_enabled(&self) -> bool {
        self.collector.mqtt.as_ref().is_some_and(|m| m.enable)
    }

    pub fn memcache_enabled(&self) -> bool {
        self.collector.memcache.as_ref().is_some_and(|m| m.enable)
    }
}
