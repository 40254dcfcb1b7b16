//! GroundLink Ingest
//!
//! Consumer side of the telemetry link. An [`IngestionLoop`] binds the UDP
//! receiver, asks the producer to start streaming, buffers every datagram
//! under the ship's name until the window closes and then asks the producer
//! to stop. The [`WindowScheduler`] defers each loop until its window opens.

#![warn(missing_docs)]

pub mod buffer;
pub mod error;
pub mod ingestion;
pub mod scheduler;

pub use buffer::{BufferError, MemoryBuffer, PacketBuffer, RedisBuffer};
pub use error::{IngestError, IngestResult};
pub use ingestion::{IngestOptions, IngestionLoop, IngestionReport, IngestionState, StopOutcome};
pub use scheduler::{Booking, BookingStatus, WindowScheduler};
