//! Data ingestor: the consumer side of GroundLink.
//!
//! Accepts ingestion window bookings over HTTP and runs each window against
//! the producer's control endpoint when it opens.

pub mod config;
pub mod handlers;
pub mod state;

use axum::{
    error_handling::HandleErrorLayer, http::StatusCode, response::Json, routing::get, BoxError,
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::timeout::{error::Elapsed, TimeoutLayer};
use tower::ServiceBuilder;

use state::AppState;

/// Upper bound on handling one request, the healthcheck's producer round trip included.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Scheduler routes over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/scheduler/",
            get(handlers::list_bookings).post(handlers::create_booking),
        )
        .route("/healthcheck/", get(handlers::health_check))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_layer_error))
                .layer(TimeoutLayer::new(REQUEST_TIMEOUT)),
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
