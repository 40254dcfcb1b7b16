//! GroundLink Control
//!
//! Consumer-side client for the producer's control endpoint. Start and stop
//! calls share one [`RetryPolicy`]: transport failures and 5xx responses are
//! retried with exponential backoff, definitive rejections (such as an unknown
//! event key) are returned immediately so callers can tell "the producer is
//! unavailable" apart from "this request is invalid".
//!
//! # Examples
//!
//! ```no_run
//! use groundlink_control::{ClientOptions, ControlPlaneClient};
//! use groundlink_core::Destination;
//!
//! # async fn demo() -> Result<(), groundlink_control::ControlError> {
//! let client = ControlPlaneClient::new("http://spaceship:8001", ClientOptions::default())?;
//! let token = client.request_start(&Destination::new("ground-station", 1001)).await?;
//! client.request_stop(&token).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod client;
pub mod error;
pub mod retry;

pub use client::{ClientOptions, ControlPlaneClient, SessionControl};
pub use error::{ControlError, ControlResult};
pub use retry::{RetryPolicy, Retryable};
