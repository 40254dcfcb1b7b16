//! Error types for the consumer side of the link.

use groundlink_control::ControlError;
use groundlink_core::CoreError;
use thiserror::Error;

/// Errors that end an ingestion run or reject a booking.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Receiver port could not be bound; never retried
    #[error("Failed to bind receiver on {addr}: {source}")]
    Bind {
        /// Address the bind was attempted on
        addr: String,
        /// Underlying socket error
        #[source]
        source: std::io::Error,
    },

    /// Start call failed (after retries, when transient)
    #[error("Control plane error: {0}")]
    Control(#[from] ControlError),

    /// Booking rejected at submission time
    #[error("{0}")]
    InvalidWindow(#[from] CoreError),
}

/// Result alias for ingestion and scheduling.
pub type IngestResult<T> = Result<T, IngestError>;
