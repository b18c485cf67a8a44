//! Error types for realtime operations.

use thiserror::Error;

/// Main error type for realtime operations.
#[derive(Error, Debug)]
pub enum RealtimeError {
    /// Malformed Engine.IO / Socket.IO frame or unexpected handshake step.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Network error (connect, timeout, broken socket).
    #[error("Network error: {0}")]
    Network(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The operation needs a live connection.
    #[error("Not connected to the realtime server")]
    NotConnected,

    /// Invalid argument error.
    #[error("Invalid argument: {0}")]
    Argument(String),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias for realtime operations.
pub type Result<T> = std::result::Result<T, RealtimeError>;

impl From<tokio_tungstenite::tungstenite::Error> for RealtimeError {
    fn from(error: tokio_tungstenite::tungstenite::Error) -> Self {
        RealtimeError::Network(error.to_string())
    }
}
