//! Ingestion loop for one scheduled window.
//!
//! ```text
//! Idle -> AwaitingStart -> Receiving -> Stopping -> Done
//!   \________________\__________________________-> Failed
//! ```
//!
//! The receiver is bound before the producer is asked to start, so the first
//! packets are not lost. Receiving continues until the window deadline; the
//! stop request afterwards is best effort and never fails the run.

use crate::buffer::PacketBuffer;
use crate::error::{IngestError, IngestResult};
use chrono::Utc;
use groundlink_control::SessionControl;
use groundlink_core::{Destination, IngestionWindow, IngestorConfig, SessionToken};
use groundlink_stream::{Datagram, PacketReceiver};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Lifecycle of one ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IngestionState {
    /// Nothing done yet
    Idle,
    /// Binding the receiver and asking the producer to start
    AwaitingStart,
    /// Buffering datagrams until the window deadline
    Receiving,
    /// Asking the producer to stop
    Stopping,
    /// Run finished; the receiver is closed
    Done,
    /// Run ended early with an error
    Failed,
}

impl fmt::Display for IngestionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IngestionState::Idle => "IDLE",
            IngestionState::AwaitingStart => "AWAITING_START",
            IngestionState::Receiving => "RECEIVING",
            IngestionState::Stopping => "STOPPING",
            IngestionState::Done => "DONE",
            IngestionState::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// How the post-window stop request ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum StopOutcome {
    /// Producer acknowledged the stop
    Stopped,
    /// Producer no longer knew the session
    AlreadyStopped,
    /// Producer could not be reached, even after retries
    Failed(String),
}

/// Summary of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct IngestionReport {
    /// Ship the window was booked for; also the buffer key
    pub ship_name: String,
    /// Producer session that served the window
    pub token: SessionToken,
    /// Datagrams read off the socket
    pub received: u64,
    /// Payloads appended to the buffer
    pub stored: u64,
    /// Datagrams dropped for being oversized or not UTF-8 text
    pub malformed: u64,
    /// Result of the post-window stop request
    pub stop: StopOutcome,
    /// States visited, in order
    pub states: Vec<IngestionState>,
}

/// Receiver settings.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Local address the receiver binds
    pub bind_addr: String,
    /// Well-known receiver port; also what the producer is told to target
    pub listen_port: u16,
    /// Host the producer should send to
    pub advertise_host: String,
    /// Upper bound on a single receive wait
    pub recv_timeout: Duration,
}

impl From<&IngestorConfig> for IngestOptions {
    fn from(config: &IngestorConfig) -> Self {
        Self {
            bind_addr: config.bind_addr.clone(),
            listen_port: config.udp_port,
            advertise_host: config.advertise_host.clone(),
            recv_timeout: Duration::from_millis(config.recv_timeout_ms),
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    received: u64,
    stored: u64,
    malformed: u64,
}

/// Tracks and logs state transitions for one run.
struct Lifecycle<'a> {
    ship_name: &'a str,
    states: Vec<IngestionState>,
}

impl<'a> Lifecycle<'a> {
    fn new(ship_name: &'a str) -> Self {
        Self {
            ship_name,
            states: vec![IngestionState::Idle],
        }
    }

    fn current(&self) -> IngestionState {
        self.states.last().copied().unwrap_or(IngestionState::Idle)
    }

    fn advance(&mut self, next: IngestionState) {
        debug!(
            ship = self.ship_name,
            from = %self.current(),
            to = %next,
            "Ingestion state change"
        );
        self.states.push(next);
    }

    fn fail(&mut self, err: IngestError) -> IngestError {
        error!(
            ship = self.ship_name,
            state = %self.current(),
            error = %err,
            "Ingestion failed"
        );
        self.advance(IngestionState::Failed);
        err
    }
}

/// Drives one window from receiver bind to stop request.
///
/// The control plane and the buffer are injected, so one instance can serve
/// every window a scheduler hands it.
#[derive(Clone)]
pub struct IngestionLoop {
    control: Arc<dyn SessionControl>,
    buffer: Arc<dyn PacketBuffer>,
    options: IngestOptions,
}

impl IngestionLoop {
    /// Loop that starts and stops sessions through `control` and appends
    /// payloads to `buffer`.
    pub fn new(
        control: Arc<dyn SessionControl>,
        buffer: Arc<dyn PacketBuffer>,
        options: IngestOptions,
    ) -> Self {
        Self {
            control,
            buffer,
            options,
        }
    }

    /// Run the full lifecycle for `window`.
    ///
    /// Expects to be invoked at (or after) `window.start_time`; it does not
    /// wait for the start itself.
    pub async fn run(&self, window: &IngestionWindow) -> IngestResult<IngestionReport> {
        let ship = window.ship_name.as_str();
        let mut lifecycle = Lifecycle::new(ship);
        info!(
            ship,
            start = %window.start_time,
            duration = window.duration,
            "Streaming data from ship"
        );

        lifecycle.advance(IngestionState::AwaitingStart);
        let bind_addr = format!("{}:{}", self.options.bind_addr, self.options.listen_port);
        let receiver = match PacketReceiver::bind(bind_addr.as_str()).await {
            Ok(receiver) => receiver,
            Err(source) => {
                return Err(lifecycle.fail(IngestError::Bind {
                    addr: bind_addr,
                    source,
                }))
            }
        };

        let destination = Destination::new(
            self.options.advertise_host.clone(),
            self.options.listen_port,
        );
        let token = match self.control.request_start(&destination).await {
            Ok(token) => token,
            Err(e) => return Err(lifecycle.fail(e.into())),
        };

        lifecycle.advance(IngestionState::Receiving);
        let counters = self.receive_until_deadline(&receiver, window).await;

        lifecycle.advance(IngestionState::Stopping);
        let stop = match self.control.request_stop(&token).await {
            Ok(()) => StopOutcome::Stopped,
            Err(e) if e.is_not_found() => {
                info!(ship, %token, "Producer session already stopped");
                StopOutcome::AlreadyStopped
            }
            Err(e) => {
                warn!(ship, %token, error = %e, "Failed to stop producer session");
                StopOutcome::Failed(e.to_string())
            }
        };

        drop(receiver);
        lifecycle.advance(IngestionState::Done);
        info!(
            ship,
            %token,
            received = counters.received,
            stored = counters.stored,
            malformed = counters.malformed,
            "Streaming data from ship completed"
        );

        Ok(IngestionReport {
            ship_name: window.ship_name.clone(),
            token,
            received: counters.received,
            stored: counters.stored,
            malformed: counters.malformed,
            stop,
            states: lifecycle.states,
        })
    }

    async fn receive_until_deadline(
        &self,
        receiver: &PacketReceiver,
        window: &IngestionWindow,
    ) -> Counters {
        let deadline = window.deadline();
        let mut counters = Counters::default();

        loop {
            let now = Utc::now();
            if now >= deadline {
                break;
            }
            let remaining = (deadline - now).to_std().unwrap_or(Duration::ZERO);
            let wait = remaining.min(self.options.recv_timeout);

            match receiver.recv_timeout(wait).await {
                Ok(Some(datagram)) => {
                    counters.received += 1;
                    self.store(&window.ship_name, datagram, &mut counters).await;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(ship = %window.ship_name, error = %e, "Error while receiving datagram");
                    tokio::task::yield_now().await;
                }
            }
        }

        counters
    }

    async fn store(&self, ship: &str, datagram: Datagram, counters: &mut Counters) {
        if datagram.oversized {
            counters.malformed += 1;
            warn!(ship, source = %datagram.source, "Dropping oversized datagram");
            return;
        }
        if std::str::from_utf8(&datagram.payload).is_err() {
            counters.malformed += 1;
            warn!(
                ship,
                source = %datagram.source,
                len = datagram.payload.len(),
                "Dropping non-UTF-8 datagram"
            );
            return;
        }

        match self.buffer.append(ship, &datagram.payload).await {
            Ok(()) => counters.stored += 1,
            Err(e) => warn!(ship, error = %e, "Failed to append packet to buffer"),
        }
    }
}
