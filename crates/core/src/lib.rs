//! Core types, errors, and configuration for Parkwatch
//!
//! This crate holds what the HTTP client, the realtime client and the CLI
//! share: the configuration file model, the error type, and the typed views
//! of the parking backend's documents.

pub mod config;
pub mod constants;
pub mod error;
pub mod types;

// Re-exports for convenience
pub use config::ParkwatchConfig;
pub use error::{Error, Result};
pub use types::*;
