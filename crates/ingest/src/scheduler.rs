//! In-memory window scheduler.
//!
//! Bookings are validated when submitted; each accepted booking gets its own
//! task that sleeps until the window opens and then hands the window to the
//! [`IngestionLoop`].

use crate::error::IngestResult;
use crate::ingestion::{IngestionLoop, IngestionReport};
use chrono::{DateTime, Utc};
use groundlink_core::IngestionWindow;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{error, info};
use uuid::Uuid;

/// Where a booking is in its life.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BookingStatus {
    /// Waiting for the window to open
    Scheduled,
    /// Ingestion loop in progress
    Running,
    /// Window closed; counts come from the ingestion report
    Completed {
        /// Payloads appended to the buffer
        stored: u64,
        /// Datagrams dropped
        malformed: u64,
    },
    /// The run ended with an error
    Failed {
        /// Error message of the failed run
        reason: String,
    },
}

/// An accepted ingestion window.
#[derive(Debug, Clone, Serialize)]
pub struct Booking {
    /// Booking identifier
    pub id: Uuid,
    /// Ship to ingest from
    pub ship_name: String,
    /// When the window opens
    pub start_time: DateTime<Utc>,
    /// Window length in seconds
    pub duration: u64,
    /// Identifier of the deferred task that will run the window
    pub task_id: Uuid,
    /// Current state of the booking
    pub status: BookingStatus,
}

/// Accepts windows and runs each one at its start time.
#[derive(Clone)]
pub struct WindowScheduler {
    ingestion: IngestionLoop,
    bookings: Arc<Mutex<Vec<Booking>>>,
}

impl WindowScheduler {
    /// Scheduler that hands each opened window to `ingestion`.
    pub fn new(ingestion: IngestionLoop) -> Self {
        Self {
            ingestion,
            bookings: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Validate `window` and defer its ingestion run until `start_time`.
    ///
    /// Rejections happen here, before anything is spawned. Failures of the
    /// run itself are only logged and reflected in the booking status.
    pub fn schedule(&self, window: IngestionWindow) -> IngestResult<Booking> {
        window.validate(Utc::now())?;

        let booking = Booking {
            id: Uuid::new_v4(),
            ship_name: window.ship_name.clone(),
            start_time: window.start_time,
            duration: window.duration,
            task_id: Uuid::new_v4(),
            status: BookingStatus::Scheduled,
        };
        self.table().push(booking.clone());
        info!(
            booking = %booking.id,
            ship = %booking.ship_name,
            start = %booking.start_time,
            duration = booking.duration,
            "Ingestion window scheduled"
        );

        let scheduler = self.clone();
        let id = booking.id;
        tokio::spawn(async move {
            scheduler.run_at_start(id, window).await;
        });

        Ok(booking)
    }

    /// Every booking, in submission order.
    pub fn bookings(&self) -> Vec<Booking> {
        self.table().clone()
    }

    /// Look up one booking.
    pub fn booking(&self, id: &Uuid) -> Option<Booking> {
        self.table().iter().find(|b| &b.id == id).cloned()
    }

    async fn run_at_start(&self, id: Uuid, window: IngestionWindow) {
        let wait = (window.start_time - Utc::now()).to_std().unwrap_or_default();
        tokio::time::sleep(wait).await;

        self.set_status(&id, BookingStatus::Running);
        let status = match self.ingestion.run(&window).await {
            Ok(IngestionReport {
                stored, malformed, ..
            }) => BookingStatus::Completed { stored, malformed },
            Err(e) => {
                error!(
                    booking = %id,
                    ship = %window.ship_name,
                    error = %e,
                    "Scheduled ingestion failed"
                );
                BookingStatus::Failed {
                    reason: e.to_string(),
                }
            }
        };
        self.set_status(&id, status);
    }

    fn set_status(&self, id: &Uuid, status: BookingStatus) {
        if let Some(booking) = self.table().iter_mut().find(|b| &b.id == id) {
            booking.status = status;
        }
    }

    fn table(&self) -> MutexGuard<'_, Vec<Booking>> {
        self.bookings.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
