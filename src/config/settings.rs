//! Application settings configuration.

use serde::{Deserialize, Serialize};

use super::{ConfigError, Result};
use crate::cache::DEFAULT_CACHE_CAPACITY;
use crate::search::{DEFAULT_PAGE_SIZE, DEFAULT_WORKERS};

/// Default JIRA server.
pub const DEFAULT_SERVER: &str = "http://jira";

/// Default REST API path.
pub const DEFAULT_API_PATH: &str = "/rest/api/";

/// Default REST API version.
pub const DEFAULT_API_VERSION: &str = "2.0.alpha1";

/// Connection and tuning settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// The JIRA server URL (e.g., "https://jira.example.com").
    pub server: String,
    /// The REST API path below the server.
    pub api_path: String,
    /// The REST API version appended to the path.
    pub api_version: String,
    /// Issues requested per search page.
    pub page_size: u32,
    /// Issue detail documents kept in memory.
    pub cache_capacity: usize,
    /// Concurrent detail resolutions.
    pub workers: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            api_path: DEFAULT_API_PATH.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            workers: DEFAULT_WORKERS,
        }
    }
}

impl Settings {
    /// Validate these settings.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError::ValidationError` with details if validation fails.
    pub fn validate(&self) -> Result<()> {
        if self.server.is_empty() {
            return Err(ConfigError::ValidationError(
                "server URL cannot be empty".to_string(),
            ));
        }

        if !self.server.starts_with("https://") && !self.server.starts_with("http://") {
            return Err(ConfigError::ValidationError(format!(
                "server '{}' must start with http:// or https://",
                self.server
            )));
        }

        if self.page_size == 0 {
            return Err(ConfigError::ValidationError(
                "page_size must be at least 1".to_string(),
            ));
        }

        if self.cache_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "cache_capacity must be at least 1".to_string(),
            ));
        }

        if self.workers == 0 {
            return Err(ConfigError::ValidationError(
                "workers must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server, "http://jira");
        assert_eq!(settings.page_size, 50);
        assert_eq!(settings.cache_capacity, 6);
        assert_eq!(settings.workers, 10);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_settings_use_defaults() {
        let settings: Settings = toml::from_str(r#"server = "https://jira.example.com""#).unwrap();
        assert_eq!(settings.server, "https://jira.example.com");
        assert_eq!(settings.api_version, "2.0.alpha1");
        assert_eq!(settings.workers, 10);
    }

    #[test]
    fn test_invalid_server_scheme_rejected() {
        let settings = Settings {
            server: "jira.example.com".to_string(),
            ..Settings::default()
        };

        let result = settings.validate();
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("must start with http"));
    }

    #[test]
    fn test_empty_server_rejected() {
        let settings = Settings {
            server: String::new(),
            ..Settings::default()
        };
        assert!(settings
            .validate()
            .unwrap_err()
            .to_string()
            .contains("cannot be empty"));
    }

    #[test]
    fn test_zero_limits_rejected() {
        for settings in [
            Settings { page_size: 0, ..Settings::default() },
            Settings { cache_capacity: 0, ..Settings::default() },
            Settings { workers: 0, ..Settings::default() },
        ] {
            assert!(settings.validate().is_err());
        }
    }
}
