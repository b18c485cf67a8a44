//! Error types for CLI operations.

use parkwatch_client::ClientError;
use parkwatch_realtime::RealtimeError;
use thiserror::Error;

/// Main error type for CLI operations.
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Backend or AI service call failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Realtime connection failed.
    #[error("Realtime error: {0}")]
    Realtime(#[from] RealtimeError),

    /// Invalid argument error.
    #[error("Invalid argument: {0}")]
    Argument(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<parkwatch_core::Error> for CliError {
    fn from(err: parkwatch_core::Error) -> Self {
        match err {
            parkwatch_core::Error::Io(e) => CliError::Io(e),
            other => CliError::Config(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::Parse(err.to_string())
    }
}

/// Result alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;
