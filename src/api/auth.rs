//! Authentication handling for the JIRA API.
//!
//! Requests are authenticated with Basic Auth (username + password). Passwords
//! may be kept in the OS keyring instead of the config file.

use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use super::error::{ApiError, Result};

/// The keyring service name for stored passwords.
const KEYRING_SERVICE: &str = "jira-search";

/// Authentication credentials for JIRA.
#[derive(Clone)]
pub struct Auth {
    /// The username.
    username: String,
    /// The Base64-encoded authorization header value.
    auth_header: String,
}

impl Auth {
    /// Create new authentication credentials from username and password.
    ///
    /// The password is immediately encoded and the raw value is not stored.
    pub fn new(username: &str, password: &str) -> Self {
        let auth_header = build_auth_header(username, password);
        Self {
            username: username.to_string(),
            auth_header,
        }
    }

    /// Get the authorization header value for HTTP requests.
    ///
    /// Returns the complete "Basic ..." header value.
    pub fn header_value(&self) -> &str {
        &self.auth_header
    }

    /// Get the username.
    pub fn username(&self) -> &str {
        &self.username
    }
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Auth")
            .field("username", &self.username)
            .field("auth_header", &"***")
            .finish()
    }
}

/// Build the Basic Auth header value.
///
/// Encodes "username:password" in Base64 and prepends "Basic ".
fn build_auth_header(username: &str, password: &str) -> String {
    let credentials = format!("{}:{}", username, password);
    let encoded = BASE64.encode(credentials.as_bytes());
    format!("Basic {}", encoded)
}

/// Retrieve a password from the OS keyring.
///
/// Entries are keyed by server URL so one keyring can hold passwords for
/// several JIRA instances.
///
/// # Errors
///
/// Returns an error if the keyring is unavailable or holds no entry.
pub fn keyring_password(server: &str) -> Result<String> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, server)
        .map_err(|e| ApiError::Keyring(format!("failed to access keyring: {}", e)))?;

    entry
        .get_password()
        .map_err(|e| ApiError::Keyring(format!("failed to retrieve password: {}", e)))
}
