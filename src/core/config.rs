//! Configuration - Type-safe, validated config

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Channel carrying venue-originated order lifecycle events.
pub const ORDER_EVENT_CHANNEL: &str = "order_events";

/// Channel carrying outbound order commands to the venue.
pub const ORDER_COMMAND_CHANNEL: &str = "order_commands";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,

    /// Message bus endpoint
    pub bus: BusConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Log level
    pub log_level: String,
}

/// Endpoint of the message bus the live client attaches to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    /// Bus host address
    pub host: String,

    /// Bus port
    pub port: u16,

    /// Grace interval granted to the consumption path on disconnect, in
    /// milliseconds. Exceeding it is reported, not silently swallowed.
    #[serde(default = "default_grace_ms")]
    pub grace_ms: u64,
}

fn default_grace_ms() -> u64 {
    100
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            grace_ms: default_grace_ms(),
        }
    }
}

impl BusConfig {
    pub fn endpoint(&self) -> String {
        format!("ws://{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app: AppConfig {
                log_level: "info".to_string(),
            },
            bus: BusConfig::default(),
        }
    }
}

impl Config {
    /// Load from TOML file
    pub fn load(path: &PathBuf) -> crate::core::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::core::ExecutionError::Config(format!("failed to read config: {e}"))
        })?;

        toml::from_str(&content).map_err(|e| {
            crate::core::ExecutionError::Config(format!("failed to parse config: {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bus_defaults() {
        let config = BusConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 6379);
        assert_eq!(config.grace_ms, 100);
        assert_eq!(config.endpoint(), "ws://127.0.0.1:6379");
    }

    #[test]
    fn test_config_from_toml() {
        let config: Config = toml::from_str(
            r#"
            [app]
            log_level = "debug"

            [bus]
            host = "10.0.0.5"
            port = 9001
            "#,
        )
        .unwrap();

        assert_eq!(config.app.log_level, "debug");
        assert_eq!(config.bus.host, "10.0.0.5");
        assert_eq!(config.bus.port, 9001);
        assert_eq!(config.bus.grace_ms, 100);
    }
}
