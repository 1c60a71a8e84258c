//! Slacker configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use slacker_api::bus::BusConfig;
use slacker_api::{REGISTER_ADDRESS, REQUEST_ADDRESS};

/// Main slacker configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Message bus tuning
    pub bus: BusConfig,

    /// Router addresses and inbound socket
    pub server: ServerConfig,

    /// Built-in help command
    pub help: HelpConfig,
}

impl Config {
    /// Validate configuration before use
    pub fn validate(&self) -> Result<()> {
        if self.bus.reply_timeout_ms == 0 {
            return Err(eyre::eyre!("bus.reply-timeout-ms must be greater than zero"));
        }
        if self.bus.channel_buffer == 0 || self.bus.consumer_buffer == 0 {
            return Err(eyre::eyre!("bus buffers must be greater than zero"));
        }
        if self.server.register_address.is_empty() || self.server.request_address.is_empty() {
            return Err(eyre::eyre!("server addresses must not be empty"));
        }
        if self.server.register_address == self.server.request_address {
            return Err(eyre::eyre!(
                "server.register-address and server.request-address must differ (both are {})",
                self.server.register_address
            ));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .slacker.yml
        let local_config = PathBuf::from(".slacker.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/slacker/slacker.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("slacker").join("slacker.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Router addresses and inbound socket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Inbound adapter socket; defaults to the runtime directory
    #[serde(rename = "socket-path")]
    pub socket_path: Option<PathBuf>,

    /// Address executors send HELLO to
    #[serde(rename = "register-address")]
    pub register_address: String,

    /// Address command requests are sent to
    #[serde(rename = "request-address")]
    pub request_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket_path: None,
            register_address: REGISTER_ADDRESS.to_string(),
            request_address: REQUEST_ADDRESS.to_string(),
        }
    }
}

/// Built-in help command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HelpConfig {
    /// Register the `help` executor at startup
    pub enabled: bool,
}

impl Default for HelpConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}
