//! Service configuration.
//!
//! `Config` is the on-disk TOML file read once at startup. The `[sdk]` section
//! seeds the in-memory [`ConfigStore`], which is what the lifecycle controller
//! reads and what `setConfig` requests mutate.

mod store;

use crate::global;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

pub use store::{CapabilityConfiguration, ConfigPatch, ConfigStore};

pub const DEFAULT_ENDPOINT: &str = "https://us-east-1.recall.ai";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub sdk: SdkConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Capacity of each connected client's outbound event queue.
    pub event_buffer: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SdkConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub request_permissions_on_startup: bool,
    /// Initialize the provider as soon as the service starts.
    pub auto_initialize: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3939,
            event_buffer: 256,
        }
    }
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_permissions_on_startup: true,
            auto_initialize: false,
        }
    }
}

impl SdkConfig {
    pub fn capability(&self) -> CapabilityConfiguration {
        CapabilityConfiguration {
            enabled: self.enabled,
            endpoint: self.endpoint.clone(),
            request_permissions_on_startup: self.request_permissions_on_startup,
        }
    }
}

impl ServerConfig {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let content =
            std::fs::read_to_string(config_path).context("Failed to read config file")?;

        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;

        info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        global::config_file()
    }
}
