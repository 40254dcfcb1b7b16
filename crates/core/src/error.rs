//! Core error types

use thiserror::Error;

/// Core error type for GroundLink
#[derive(Debug, Error)]
pub enum CoreError {
    /// Session token could not be parsed
    #[error("Invalid session token: {0}")]
    InvalidToken(String),

    /// Ingestion window rejected at submission time
    #[error("Invalid ingestion window: {0}")]
    InvalidWindow(String),

    /// Telemetry record could not be encoded or decoded
    #[error("Packet codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
