//! Error types for GroundLink stream operations.
//!
//! None of these terminate a running transmission session: the send loop
//! logs transport failures and keeps going until it is cancelled.

use groundlink_core::{CoreError, SessionToken};
use thiserror::Error;

/// Errors that can occur in stream operations.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Session token is not (or no longer) tracked by the registry
    #[error("Session not found: {token}")]
    SessionNotFound {
        /// Token that was looked up
        token: SessionToken,
    },

    /// Invalid stream configuration
    #[error("Invalid stream configuration: {0}")]
    InvalidConfig(String),

    /// Admission gate was closed while a session was waiting
    #[error("Admission gate closed")]
    GateClosed,

    /// Destination host did not resolve to any address
    #[error("Destination {destination} did not resolve")]
    Unresolved {
        /// Destination as `host:port`
        destination: String,
    },

    /// Packet encoding errors
    #[error("Packet codec error: {0}")]
    Codec(#[from] CoreError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for stream operations.
pub type StreamResult<T> = Result<T, StreamError>;
