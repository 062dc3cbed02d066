//! Centralized error types for jira-search.
//!
//! This module provides a unified error hierarchy for the application with
//! user-friendly error messages. All error types use `thiserror` for
//! ergonomic error handling.

use thiserror::Error;

use crate::api::error::ApiError;
use crate::config::ConfigError;

/// The main application error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration-related errors.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// API-related errors.
    #[error("{0}")]
    Api(#[from] ApiError),

    /// IO errors (terminal, file system).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Get a user-friendly message for display.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Config(e) => match e {
                ConfigError::NoConfigDir => {
                    "Could not find configuration directory. Please check your system settings."
                        .to_string()
                }
                ConfigError::ReadError(_) => {
                    "Could not read configuration file. Please check the file is readable.".to_string()
                }
                ConfigError::ParseError(_) => {
                    "Configuration file is invalid. Please check the file format.".to_string()
                }
                ConfigError::ValidationError(msg) => format!("Configuration error: {}", msg),
            },
            AppError::Api(e) => match e {
                ApiError::InvalidQuery => "Please provide a JQL query.".to_string(),
                ApiError::Unauthorized => {
                    "Authentication failed. Please check your username and password.".to_string()
                }
                ApiError::Forbidden => {
                    "Access denied. You don't have permission to access this resource.".to_string()
                }
                ApiError::NotFound(resource) => format!("'{}' was not found.", resource),
                ApiError::RateLimited => {
                    "Too many requests. Please wait a moment and try again.".to_string()
                }
                ApiError::ServerError(_) => "JIRA server error. Please try again later.".to_string(),
                ApiError::Network(_) => {
                    "Connection failed. Please check your network and server URL.".to_string()
                }
                ApiError::InvalidResponse(_) => {
                    "Unexpected response from JIRA. Check the configured API version.".to_string()
                }
                ApiError::UnknownField { .. }
                | ApiError::UnknownSubfield { .. }
                | ApiError::UnsupportedValueShape { .. } => {
                    format!("Issue data did not have the expected shape: {}", e)
                }
                ApiError::UnsupportedMethod(m) => format!("Internal error: unsupported method {}", m),
                ApiError::Credentials(msg) => format!("Could not read credentials: {}", msg),
                ApiError::Keyring(_) => {
                    "Could not access secure storage. Add the password to the config file.".to_string()
                }
            },
            AppError::Io(_) => "A terminal or file operation failed.".to_string(),
        }
    }

    /// Get a suggested action for the user.
    pub fn suggested_action(&self) -> Option<&'static str> {
        match self {
            AppError::Config(ConfigError::ParseError(_))
            | AppError::Config(ConfigError::ValidationError(_)) => {
                Some("Fix the file at $JIRA_SEARCH_CONFIG or ~/.config/jira-search/config.toml.")
            }
            AppError::Api(ApiError::Unauthorized) => {
                Some("Check the [credentials] entry for this server in your config file.")
            }
            AppError::Api(ApiError::Network(_)) => {
                Some("Check your network connection and the --server URL.")
            }
            AppError::Api(ApiError::InvalidQuery) => Some("Example: jira-search search 'assignee = currentUser()'"),
            _ => None,
        }
    }
}

/// Result type for application operations.
pub type Result<T> = std::result::Result<T, AppError>;
