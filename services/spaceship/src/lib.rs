//! Spaceship: the producer side of GroundLink.
//!
//! Exposes the HTTP control endpoint that starts and stops telemetry streams.
//! The binary in `main.rs` wires configuration and logging around [`router`].

pub mod config;
pub mod handlers;
pub mod state;

use axum::{
    error_handling::HandleErrorLayer,
    http::StatusCode,
    response::Json,
    routing::{delete, get},
    BoxError, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::timeout::{error::Elapsed, TimeoutLayer};
use tower::ServiceBuilder;

use state::AppState;

/// Upper bound on handling one control request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Control endpoint routes over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let routes = Router::new()
        .route(
            "/stream/",
            get(handlers::list_streams).post(handlers::start_stream),
        )
        .route("/stream/:stream_key", delete(handlers::stop_stream))
        .route("/healthcheck/", get(handlers::health_check))
        .with_state(state);
    with_timeout(routes, REQUEST_TIMEOUT)
}

fn with_timeout(routes: Router, timeout: Duration) -> Router {
    routes.layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handle_layer_error))
            .layer(TimeoutLayer::new(timeout)),
    )
}

async fn handle_layer_error(err: BoxError) -> (StatusCode, Json<Value>) {
    if err.is::<Elapsed>() {
        (
            StatusCode::REQUEST_TIMEOUT,
            Json(json!({"detail": "Request timed out"})),
        )
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"detail": err.to_string()})),
        )
    }
}
