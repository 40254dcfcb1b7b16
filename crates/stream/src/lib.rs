//! GroundLink Stream
//!
//! Producer side of the telemetry link: the session registry, its admission
//! gate, the per-session send loop and the UDP transport helpers shared with
//! the consumer.

#![warn(missing_docs)]

pub mod error;
pub mod gate;
pub mod registry;
pub mod session;
pub mod transport;

pub use error::{StreamError, StreamResult};
pub use gate::{AdmissionGate, AdmissionPermit};
pub use registry::SessionRegistry;
pub use session::{generate_packet, SessionConfig};
pub use transport::{Datagram, PacketReceiver, PacketSender};
