//! Core functionality for the GroundLink telemetry link.
//!
//! This crate provides the types shared by the producer (`spaceship`) and the
//! consumer (`data-ingestor`): session tokens, the telemetry wire record,
//! ingestion windows, configuration and logging setup.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use config::{ConfigError, GroundLinkConfig, IngestorConfig, ProducerConfig, RetryConfig};
pub use error::{CoreError, Result};
pub use types::{Destination, IngestionWindow, SessionToken, TelemetryPacket, MAX_DATAGRAM_SIZE};
