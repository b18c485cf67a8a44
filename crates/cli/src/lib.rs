//! Command-line interface for Parkwatch.
//!
//! This crate wires the HTTP client, the realtime client and the AI
//! services into the `parkwatch` binary.

#![deny(missing_docs, unsafe_code)]

/// CLI command definitions and parsing.
pub mod commands;

/// CLI application entry point and command dispatch.
pub mod app;

/// Error types for CLI operations.
pub mod error;

/// Text and JSON rendering of command results.
pub mod output;
