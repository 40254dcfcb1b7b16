//! Core types shared by the producer and the consumer side of the link.

use crate::error::{CoreError, Result};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Largest datagram either side of the link expects to handle.
pub const MAX_DATAGRAM_SIZE: usize = 1024;

/// Opaque handle for one producer-side transmission session.
///
/// Serialized as a bare string; this is the `event_key` of the control plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(Uuid);

impl SessionToken {
    /// Mint a fresh, never-reused token.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SessionToken {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| CoreError::InvalidToken(s.to_string()))
    }
}

/// Where a transmission session sends its datagrams.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Destination {
    /// Host name or IP literal
    pub host: String,
    /// UDP port
    pub port: u16,
}

impl Destination {
    /// Create a destination.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// One telemetry record; exactly one of these travels in each datagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryPacket {
    /// ISO-8601 UTC timestamp of generation
    pub timestamp: String,
    /// Human-readable measurement label
    pub description: String,
    /// Measured value
    pub value: serde_json::Number,
    /// Measurement unit
    pub unit: String,
}

impl TelemetryPacket {
    /// Build a packet stamped with `at`.
    pub fn new(
        at: DateTime<Utc>,
        description: impl Into<String>,
        value: impl Into<serde_json::Number>,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: at.to_rfc3339_opts(SecondsFormat::Micros, true),
            description: description.into(),
            value: value.into(),
            unit: unit.into(),
        }
    }

    /// Serialize to the wire representation.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse a wire record.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// The scheduled `(ship, start, duration)` tuple driving one ingestion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionWindow {
    /// Ship identifier; also the buffer key
    pub ship_name: String,
    /// Absolute UTC start time
    pub start_time: DateTime<Utc>,
    /// Length of the window in seconds
    pub duration: u64,
}

impl IngestionWindow {
    /// Create a window.
    pub fn new(ship_name: impl Into<String>, start_time: DateTime<Utc>, duration: u64) -> Self {
        Self {
            ship_name: ship_name.into(),
            start_time,
            duration,
        }
    }

    /// Instant until which packets must keep being received.
    pub fn deadline(&self) -> DateTime<Utc> {
        let secs = i64::try_from(self.duration)
            .unwrap_or(i64::MAX)
            .min(i64::MAX / 1_000);
        self.start_time
            .checked_add_signed(Duration::seconds(secs))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Submission-time validation against the current clock.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<()> {
        if self.ship_name.trim().is_empty() {
            return Err(CoreError::InvalidWindow(
                "ship_name cannot be empty".to_string(),
            ));
        }
        if self.duration == 0 {
            return Err(CoreError::InvalidWindow(
                "duration must be a positive number of seconds".to_string(),
            ));
        }
        if self.start_time <= now {
            return Err(CoreError::InvalidWindow(format!(
                "start_time {} must be later than the current time {}",
                self.start_time.to_rfc3339(),
                now.to_rfc3339()
            )));
        }
        Ok(())
    }
}
