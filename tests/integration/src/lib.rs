//! End-to-end tests for the GroundLink telemetry link
//!
//! This test suite validates:
//! - A scheduled window driving the producer over HTTP and buffering its UDP stream
//! - Byte-identical delivery of a known telemetry record
//! - Admission gate behaviour observed through the control endpoint
//! - Not-found handling across the client/producer boundary
//! - Bookings submitted over HTTP to the data-ingestor service

pub mod test_utils;

#[cfg(test)]
mod end_to_end_tests;

#[cfg(test)]
mod control_plane_tests;

#[cfg(test)]
mod scheduler_tests;
