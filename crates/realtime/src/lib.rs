//! Realtime push events for Parkwatch.
//!
//! The parking backend pushes per-area processing events over Socket.IO.
//! [`RealtimeClient`] keeps that connection alive with exponential backoff,
//! holds at most one area room and relays events to registered handlers.

#![deny(unsafe_code)]

/// Reconnecting event client.
pub mod client;

/// Connection settings and reconnect schedule.
pub mod config;

/// Connection seam and WebSocket transport.
pub mod connection;

/// Error types for realtime operations.
pub mod error;

/// Socket.IO framing and event payloads.
pub mod protocol;

pub use client::{ConnectionState, RealtimeClient, Subscription};
pub use config::{ReconnectPolicy, RealtimeSettings};
pub use connection::{Connection, Connector, WsConnector};
pub use error::{RealtimeError, Result};
pub use protocol::ServerEvent;
