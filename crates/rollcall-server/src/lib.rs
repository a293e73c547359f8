//! rollcall-server - HTTP ingestion server for rollcall.
//!
//! Scanners POST sightings to `/api/detect`. Each sighting runs through the
//! detection pipeline on its own task and is always acknowledged with `OK`
//! once its body decodes. A sighting still running when the request timeout
//! elapses is acknowledged anyway and finishes in the background.
//!
//! # Example
//!
//! ```ignore
//! use rollcall_core::RollcallConfig;
//! use rollcall_server::{create_server, create_state};
//!
//! let config = RollcallConfig::from_env()?;
//! let app = create_server(create_state(&config)?, &config.server);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! ```

pub mod error;
pub mod factory;
pub mod middleware;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use factory::{create_collaborators, create_state};
pub use routes::Acknowledgement;
pub use state::{AppState, ServiceInfo};

use std::time::Duration;

use axum::{middleware as axum_middleware, Router};
use rollcall_core::config::ServerConfig;
use tower_http::trace::TraceLayer;

/// Create the server with all routes and middleware.
pub fn create_server(state: AppState, config: &ServerConfig) -> Router {
    let request_timeout = Duration::from_secs(config.request_timeout_secs);
    routes::create_router(state.with_ack_deadline(request_timeout), request_timeout)
        .layer(TraceLayer::new_for_http())
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
}
