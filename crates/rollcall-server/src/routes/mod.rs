//! Route definitions for the HTTP server.

mod detect;
mod health;

use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::timeout::TimeoutLayer;

use crate::state::AppState;

/// Create the main application router.
///
/// `/api/detect` is not under the timeout layer: it enforces its own deadline
/// and still answers `200 OK` when it expires.
pub fn create_router(state: AppState, request_timeout: Duration) -> Router {
    let timed = Router::new()
        .route("/health", get(health::health_check))
        .layer(TimeoutLayer::new(request_timeout));

    Router::new()
        .route("/api/detect", post(detect::detect))
        .merge(timed)
        .with_state(state)
}

pub use detect::*;
pub use health::*;
