//! Health check endpoint.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub store: &'static str,
    pub notifier: &'static str,
}

/// Health check endpoint.
/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: if state.is_shutting_down() {
            "shutting_down"
        } else {
            "healthy"
        },
        version: env!("CARGO_PKG_VERSION"),
        store: state.info.store,
        notifier: state.info.notifier,
    })
}
