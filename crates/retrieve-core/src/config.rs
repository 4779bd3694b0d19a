//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/retrieve/config.toml)
//! 3. Environment variables (RETRIEVE_* prefix)
//!
//! Environment variables take precedence over config file values. Command
//! line flags, applied by the binary, take precedence over both.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::store::{StoreOptions, DEFAULT_MAX_CONNECTIONS};

/// Environment variable prefix
const ENV_PREFIX: &str = "RETRIEVE";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Address the block server listens on
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Store connection string: a `postgres://` URL or an embedded database path
    #[serde(default = "default_store")]
    pub store: String,

    /// Address of the block server used by client commands
    #[serde(default = "default_server_addr")]
    pub server_addr: String,

    /// Connection pool size for a distributed store
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Log level when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            store: default_store(),
            server_addr: default_server_addr(),
            max_connections: default_max_connections(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (RETRIEVE_LISTEN, RETRIEVE_STORE, ...)
    /// 2. Config file (~/.config/retrieve/config.toml or RETRIEVE_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring an explicit file path when given
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var(format!("{}_LISTEN", ENV_PREFIX)) {
            self.listen = val;
        }

        if let Ok(val) = std::env::var(format!("{}_STORE", ENV_PREFIX)) {
            self.store = val;
        }

        if let Ok(val) = std::env::var(format!("{}_SERVER_ADDR", ENV_PREFIX)) {
            self.server_addr = val;
        }

        if let Ok(val) = std::env::var(format!("{}_MAX_CONNECTIONS", ENV_PREFIX)) {
            self.max_connections = val
                .parse()
                .with_context(|| format!("Invalid {}_MAX_CONNECTIONS: {:?}", ENV_PREFIX, val))?;
        }

        if let Ok(val) = std::env::var(format!("{}_LOG_LEVEL", ENV_PREFIX)) {
            self.log_level = val;
        }

        Ok(())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;
        Ok(())
    }

    /// Options used when opening the configured store
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            max_connections: self.max_connections,
            ..StoreOptions::default()
        }
    }

    /// Get the config file path
    ///
    /// Can be overridden with RETRIEVE_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("retrieve")
            .join("config.toml")
    }
}

fn default_listen() -> String {
    "0.0.0.0:9876".to_string()
}

fn default_server_addr() -> String {
    "127.0.0.1:9876".to_string()
}

/// Embedded database in the local data directory
fn default_store() -> String {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("retrieve")
        .join("blocks.db")
        .to_string_lossy()
        .into_owned()
}

fn default_max_connections() -> u32 {
    DEFAULT_MAX_CONNECTIONS
}

fn default_log_level() -> String {
    "info".to_string()
}
