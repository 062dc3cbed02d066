//! Configuration management.
//!
//! This module handles loading the TOML configuration file, which carries
//! connection settings and optional per-server credentials.

mod credentials;
mod settings;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

pub use credentials::{prompt_credentials, resolve_credentials, CredentialEntry, Credentials};
pub use settings::{Settings, DEFAULT_API_PATH, DEFAULT_API_VERSION, DEFAULT_SERVER};

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "JIRA_SEARCH_CONFIG";

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No platform configuration directory could be determined.
    #[error("Could not determine configuration directory")]
    NoConfigDir,

    /// The config file exists but could not be read.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// The config file is not valid TOML for this schema.
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    /// A value in the config file is out of range.
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// The whole configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Connection and tuning settings.
    pub settings: Settings,
    /// Credentials keyed by server URL.
    pub credentials: BTreeMap<String, CredentialEntry>,
}

impl Config {
    /// Load the configuration from its default location.
    ///
    /// A missing file yields the default configuration.
    pub fn load() -> Result<Self> {
        let path = config_path()?;
        Self::load_from(&path)
    }

    /// Load the configuration from `path`.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.settings.validate()?;

        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// The credential entry for `server`, ignoring trailing slashes.
    pub fn credentials_for(&self, server: &str) -> Option<&CredentialEntry> {
        let wanted = server.trim_end_matches('/');
        self.credentials
            .iter()
            .find(|(key, _)| key.trim_end_matches('/') == wanted)
            .map(|(_, entry)| entry)
    }
}

/// Get the configuration file path.
///
/// `$JIRA_SEARCH_CONFIG` wins; otherwise `<config_dir>/jira-search/config.toml`.
pub fn config_path() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
        return Ok(PathBuf::from(path));
    }

    let base = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    Ok(base.join("jira-search").join("config.toml"))
}
