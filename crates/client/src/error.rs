//! Error types for the Parkwatch HTTP client.

use thiserror::Error;

/// Main error type for client operations.
///
/// Every variant carries plain strings so the error can be cloned and handed
/// to all callers waiting on one shared token refresh.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// No response from the server (connect, timeout, broken stream).
    #[error("Network error: {0}")]
    Network(String),

    /// No access token is held; log in first.
    #[error("Not authenticated: log in first")]
    NotAuthenticated,

    /// The server still answered 401 after a successful token refresh.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The token refresh failed and the local session was torn down.
    #[error("Session expired: {0}")]
    SessionExpired(String),

    /// 4xx reply carrying the server's message.
    #[error("Request rejected ({status}): {message}")]
    Validation {
        /// HTTP status code.
        status: u16,
        /// Message from the body, or the status text.
        message: String,
    },

    /// 5xx reply.
    #[error("Server error ({status}): {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Message from the body, or the status text.
        message: String,
    },

    /// The reply body did not have the expected shape.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Invalid client configuration or URL.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Session storage failure.
    #[error("Session storage error: {0}")]
    Storage(String),

    /// Invalid argument supplied by the caller.
    #[error("Invalid argument: {0}")]
    Argument(String),
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

impl ClientError {
    /// Map a non-success status and its extracted message to an error.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 => ClientError::Unauthorized(message),
            500..=599 => ClientError::Server { status, message },
            _ => ClientError::Validation { status, message },
        }
    }

    /// Whether the error means the user has to log in again.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            ClientError::NotAuthenticated
                | ClientError::Unauthorized(_)
                | ClientError::SessionExpired(_)
        )
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(error: serde_json::Error) -> Self {
        ClientError::Decode(error.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(error: std::io::Error) -> Self {
        ClientError::Storage(error.to_string())
    }
}

impl From<parkwatch_core::Error> for ClientError {
    fn from(error: parkwatch_core::Error) -> Self {
        ClientError::Config(error.to_string())
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            ClientError::Decode(error.to_string())
        } else if error.is_builder() {
            ClientError::Config(error.to_string())
        } else {
            ClientError::Network(error.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert!(matches!(
            ClientError::from_status(400, "Missing required fields"),
            ClientError::Validation { status: 400, .. }
        ));
        assert!(matches!(
            ClientError::from_status(503, "down"),
            ClientError::Server { status: 503, .. }
        ));
        assert!(ClientError::from_status(401, "expired").is_auth());
        assert!(!ClientError::from_status(404, "Report not found.").is_auth());
    }
}
