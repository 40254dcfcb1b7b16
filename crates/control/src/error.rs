//! Control-plane error classification.
//!
//! Transient failures (the producer could not be reached or answered 5xx)
//! are retried by [`RetryPolicy`](crate::retry::RetryPolicy). Definitive
//! outcomes (unknown event key, other 4xx, malformed responses) surface on
//! the first attempt.

use crate::retry::Retryable;
use thiserror::Error;

/// Errors returned by control-plane calls.
#[derive(Debug, Error)]
pub enum ControlError {
    /// Connection refused, timeout, broken body and similar network failures
    #[error("Control plane transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Producer reachable but temporarily unable to serve the request
    #[error("Control plane unavailable (HTTP {status}): {body}")]
    Unavailable {
        /// HTTP status code
        status: u16,
        /// Response body, for diagnostics
        body: String,
    },

    /// Producer does not know the session
    #[error("Event key not found: {event_key}")]
    NotFound {
        /// Key that was addressed
        event_key: String,
    },

    /// Producer refused the request as invalid
    #[error("Control plane rejected request (HTTP {status}): {body}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Response body, for diagnostics
        body: String,
    },

    /// Response did not have the expected shape
    #[error("Invalid control plane response: {0}")]
    InvalidResponse(String),
}

impl ControlError {
    /// Whether this is the definitive "no such session" outcome.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ControlError::NotFound { .. })
    }
}

impl Retryable for ControlError {
    fn is_transient(&self) -> bool {
        match self {
            ControlError::Transport(e) => !(e.is_builder() || e.is_decode() || e.is_redirect()),
            ControlError::Unavailable { .. } => true,
            ControlError::NotFound { .. }
            | ControlError::Rejected { .. }
            | ControlError::InvalidResponse(_) => false,
        }
    }
}

/// Result type for control-plane calls.
pub type ControlResult<T> = Result<T, ControlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(ControlError::Unavailable {
            status: 503,
            body: String::new()
        }
        .is_transient());
        assert!(!ControlError::NotFound {
            event_key: "k".to_string()
        }
        .is_transient());
        assert!(!ControlError::Rejected {
            status: 422,
            body: String::new()
        }
        .is_transient());
        assert!(!ControlError::InvalidResponse("bad".to_string()).is_transient());
    }

    #[test]
    fn test_not_found_is_distinguishable() {
        let err = ControlError::NotFound {
            event_key: "k".to_string(),
        };
        assert!(err.is_not_found());
        assert!(!ControlError::Unavailable {
            status: 502,
            body: String::new()
        }
        .is_not_found());
    }
}
