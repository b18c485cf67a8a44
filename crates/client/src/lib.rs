//! Authenticated HTTP client for the Parkwatch parking backend.
//!
//! [`AuthClient`] carries the session and the single-flight token refresh;
//! the typed resource calls in [`api`] borrow it. [`AiClient`] talks to the
//! unauthenticated AI services.

#![deny(unsafe_code)]

/// Typed resource calls.
pub mod api;

/// Report chat and prediction services.
pub mod ai;

/// Session handling and token refresh.
pub mod auth;

/// Error types for client operations.
pub mod error;

/// Session persistence.
pub mod session;

/// HTTP transport seam.
pub mod transport;

pub use ai::{AiClient, RagAnswer};
pub use api::Ack;
pub use auth::{AuthClient, AuthState, RegisterResponse};
pub use error::{ClientError, Result};
pub use session::{FileSessionStore, MemorySessionStore, Session, SessionStore};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Method, ReqwestTransport};
