use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use groundlink_core::{Destination, SessionToken};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::state::AppState;

type ApiError = (StatusCode, Json<Value>);

fn stream_not_found() -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"detail": "Event key not found"})),
    )
}

pub async fn list_streams(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({ "active_streams": state.registry.list_active() }))
}

pub async fn start_stream(
    State(state): State<Arc<AppState>>,
    Json(destination): Json<Destination>,
) -> Json<Value> {
    let event_key = state.registry.create(destination);
    let gate = state.registry.gate();
    info!(
        %event_key,
        running = gate.running(),
        waiting = gate.waiting(),
        "Communication started"
    );

    Json(json!({
        "message": "Communication started",
        "event_key": event_key
    }))
}

pub async fn stop_stream(
    State(state): State<Arc<AppState>>,
    Path(stream_key): Path<String>,
) -> Result<Json<Value>, ApiError> {
    // A key that is not even a UUID cannot name a session.
    let token: SessionToken = stream_key.parse().map_err(|_| {
        warn!(stream_key = %stream_key, "Stop requested for malformed event key");
        stream_not_found()
    })?;

    match state.registry.cancel(&token) {
        Ok(()) => Ok(Json(json!({"message": "Communication stopped"}))),
        Err(e) => {
            warn!(%token, error = %e, "Stop requested for unknown stream");
            Err(stream_not_found())
        }
    }
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    let gate = state.registry.gate();
    Json(json!({
        "message": "Service is up and running.",
        "capacity": gate.capacity(),
        "running": gate.running(),
        "waiting": gate.waiting(),
    }))
}
