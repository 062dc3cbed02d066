//! API error types for the JIRA search client.

use thiserror::Error;

/// Errors that can occur when searching JIRA or resolving issue fields.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The search was started without a JQL query.
    #[error("Invalid query: JQL string not set")]
    InvalidQuery,

    /// Authentication failed - invalid username or password.
    #[error("Authentication failed: check your username and password")]
    Unauthorized,

    /// Permission denied - user lacks access to the resource.
    #[error("Permission denied: you don't have access to this resource")]
    Forbidden,

    /// Resource not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Rate limited by the JIRA API.
    #[error("Rate limited: please wait before retrying")]
    RateLimited,

    /// JIRA server error.
    #[error("JIRA server error: {0}")]
    ServerError(String),

    /// Network or HTTP error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Invalid response from the API.
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// The detail document has no such field.
    #[error("Unknown field '{field}' on {locator}")]
    UnknownField { field: String, locator: String },

    /// A structured field value has no such sub-key.
    #[error("Unknown subfield '{sub}' of field '{field}' (value: {value})")]
    UnknownSubfield {
        field: String,
        sub: String,
        value: serde_json::Value,
    },

    /// A field value is neither a string nor an object.
    #[error("Unsupported value shape for field '{field}': {value}")]
    UnsupportedValueShape {
        field: String,
        value: serde_json::Value,
    },

    /// A request method other than GET or POST was asked for.
    #[error("Unsupported request method: {0}")]
    UnsupportedMethod(String),

    /// Credentials could not be obtained.
    #[error("Credentials error: {0}")]
    Credentials(String),

    /// Keyring error when retrieving passwords.
    #[error("Keyring error: {0}")]
    Keyring(String),
}

/// Result type for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Coarse classification of an [`ApiError`].
///
/// Lets callers tell programmer errors, bad input, network failures and
/// remote data-contract mismatches apart without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidQuery,
    Transport,
    InvalidResponse,
    UnknownField,
    UnknownSubfield,
    UnsupportedValueShape,
    UnsupportedMethod,
    Credentials,
    /// A task ended without producing a result (e.g. it panicked).
    Internal,
}

impl ApiError {
    /// Create an error from an HTTP status code.
    pub fn from_status(status: reqwest::StatusCode, context: &str) -> Self {
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            403 => ApiError::Forbidden,
            404 => ApiError::NotFound(context.to_string()),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(format!("HTTP {}: {}", status, context)),
            _ => ApiError::ServerError(format!("Unexpected HTTP {}: {}", status, context)),
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::InvalidQuery => ErrorKind::InvalidQuery,
            ApiError::Unauthorized
            | ApiError::Forbidden
            | ApiError::NotFound(_)
            | ApiError::RateLimited
            | ApiError::ServerError(_)
            | ApiError::Network(_) => ErrorKind::Transport,
            ApiError::InvalidResponse(_) => ErrorKind::InvalidResponse,
            ApiError::UnknownField { .. } => ErrorKind::UnknownField,
            ApiError::UnknownSubfield { .. } => ErrorKind::UnknownSubfield,
            ApiError::UnsupportedValueShape { .. } => ErrorKind::UnsupportedValueShape,
            ApiError::UnsupportedMethod(_) => ErrorKind::UnsupportedMethod,
            ApiError::Credentials(_) | ApiError::Keyring(_) => ErrorKind::Credentials,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_error_from_status_401() {
        let err = ApiError::from_status(StatusCode::UNAUTHORIZED, "test");
        assert!(matches!(err, ApiError::Unauthorized));
    }

    #[test]
    fn test_error_from_status_404() {
        let err = ApiError::from_status(StatusCode::NOT_FOUND, "issue PROJ-123");
        match err {
            ApiError::NotFound(msg) => assert_eq!(msg, "issue PROJ-123"),
            _ => panic!("Expected NotFound error"),
        }
    }

    #[test]
    fn test_error_from_status_429() {
        let err = ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, "test");
        assert!(matches!(err, ApiError::RateLimited));
    }

    #[test]
    fn test_error_from_status_500() {
        let err = ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "test");
        assert!(matches!(err, ApiError::ServerError(_)));
    }

    #[test]
    fn test_http_errors_are_transport_kind() {
        for status in [
            StatusCode::UNAUTHORIZED,
            StatusCode::FORBIDDEN,
            StatusCode::NOT_FOUND,
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::BAD_GATEWAY,
            StatusCode::IM_A_TEAPOT,
        ] {
            assert_eq!(ApiError::from_status(status, "x").kind(), ErrorKind::Transport);
        }
    }

    #[test]
    fn test_data_contract_kinds() {
        let err = ApiError::UnknownSubfield {
            field: "assignee".to_string(),
            sub: "email".to_string(),
            value: serde_json::json!({"name": "jdoe"}),
        };
        assert_eq!(err.kind(), ErrorKind::UnknownSubfield);
        assert_eq!(ApiError::InvalidQuery.kind(), ErrorKind::InvalidQuery);
        assert_eq!(
            ApiError::UnsupportedMethod("PUT".to_string()).kind(),
            ErrorKind::UnsupportedMethod
        );
    }

    #[test]
    fn test_error_display_carries_context() {
        let err = ApiError::UnsupportedValueShape {
            field: "votes".to_string(),
            value: serde_json::json!(3),
        };
        assert_eq!(
            err.to_string(),
            "Unsupported value shape for field 'votes': 3"
        );

        let err = ApiError::UnknownField {
            field: "summary".to_string(),
            locator: "http://jira/rest/api/2.0.alpha1/issue/1".to_string(),
        };
        assert!(err.to_string().contains("summary"));
        assert!(err.to_string().contains("issue/1"));
    }
}
