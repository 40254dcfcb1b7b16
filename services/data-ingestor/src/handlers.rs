use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use groundlink_core::IngestionWindow;
use groundlink_ingest::{Booking, IngestError};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::state::AppState;

type ApiError = (StatusCode, Json<Value>);

fn bad_request(detail: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "detail": detail.into() })),
    )
}

#[derive(Debug, Deserialize)]
pub struct BookingRequest {
    pub ship_name: String,
    pub start_time: DateTime<Utc>,
    /// Signed so that negative values reach validation instead of the decoder
    pub duration: i64,
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BookingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Booking>), ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!(error = %rejection, "Malformed booking request");
        bad_request(rejection.body_text())
    })?;

    let duration = u64::try_from(request.duration)
        .map_err(|_| bad_request("duration must be a positive number of seconds"))?;
    let window = IngestionWindow::new(request.ship_name, request.start_time, duration);

    match state.scheduler.schedule(window) {
        Ok(booking) => Ok((StatusCode::CREATED, Json(booking))),
        Err(IngestError::InvalidWindow(e)) => {
            info!(error = %e, "Booking rejected");
            Err(bad_request(e.to_string()))
        }
        Err(e) => {
            error!(error = %e, "Failed to schedule booking");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "detail": e.to_string() })),
            ))
        }
    }
}

pub async fn list_bookings(State(state): State<Arc<AppState>>) -> Json<Vec<Booking>> {
    Json(state.scheduler.bookings())
}

fn dependency_status<E: std::fmt::Display>(name: &str, result: Result<(), E>) -> (bool, Value) {
    match result {
        Ok(()) => (true, json!("ok")),
        Err(e) => {
            warn!(dependency = name, error = %e, "Health check failed");
            (false, json!(format!("unavailable: {}", e)))
        }
    }
}

/// Reports 503 unless both the producer and the packet buffer answer.
pub async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let (spaceship, buffer) = tokio::join!(state.control.health(), state.buffer.ping());
    let (spaceship_ok, spaceship) = dependency_status("spaceship", spaceship);
    let (buffer_ok, buffer) = dependency_status("packet_buffer", buffer);

    let (status, message) = if spaceship_ok && buffer_ok {
        (StatusCode::OK, "Service is up and running.")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "Service is degraded.")
    };

    let body = json!({
        "message": message,
        "bookings": state.scheduler.bookings().len(),
        "spaceship_url": state.config.spaceship_url,
        "dependencies": {
            "spaceship": spaceship,
            "packet_buffer": buffer,
        },
    });
    (status, Json(body))
}
