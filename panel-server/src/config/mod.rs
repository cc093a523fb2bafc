use crate::config::servers::ServersConfig;
use crate::config::token::TokenConfig;
use config::{Config as ConfigCrate, ConfigError};
use serde::Deserialize;

pub mod servers;
pub mod token;

/// Main configuration structure for the panel server
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PanelConfig {
    /// The port the server will listen to (default: 8080)
    pub port: u16,

    /// Bearer token verification
    pub token: TokenConfig,

    /// Managed server registry
    pub servers: ServersConfig,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            token: TokenConfig::default(),
            servers: ServersConfig::default(),
        }
    }
}

impl PanelConfig {
    /// Creates a new Config instance from environment variables.
    ///
    /// Variables use the `PANEL_` prefix and `__` between nested keys, e.g.
    /// `PANEL_PORT` or `PANEL_TOKEN__SECRET`.
    pub fn new() -> Result<Self, String> {
        ConfigCrate::builder()
            .add_source(
                config::Environment::with_prefix("PANEL")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e: ConfigError| e.to_string())?
            .try_deserialize()
            .map_err(|e| e.to_string())
    }

    #[cfg(test)]
    pub fn for_test(secret: &str, servers_path: &str) -> Self {
        Self {
            port: 0, // Let the OS choose a port
            token: TokenConfig {
                secret: secret.to_string(),
                ..Default::default()
            },
            servers: ServersConfig {
                path: servers_path.to_string(),
            },
        }
    }
}
