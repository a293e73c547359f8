//! Server state management.

use std::sync::Arc;
use std::time::Duration;

use rollcall_core::pipeline::DetectionPipeline;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Names of the adapters the server was wired with, for the health report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceInfo {
    pub store: &'static str,
    pub notifier: &'static str,
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<DetectionPipeline>,
    pub info: ServiceInfo,
    /// Cancelled when the server starts shutting down.
    pub shutdown: CancellationToken,
    /// Tracks spawned sighting tasks so shutdown can wait for them.
    pub tasks: TaskTracker,
    /// How long `/api/detect` waits for its sighting before acknowledging.
    pub ack_deadline: Duration,
}

impl AppState {
    pub fn new(pipeline: DetectionPipeline, info: ServiceInfo) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            info,
            shutdown: CancellationToken::new(),
            tasks: TaskTracker::new(),
            ack_deadline: Duration::from_secs(10),
        }
    }

    pub fn with_ack_deadline(mut self, deadline: Duration) -> Self {
        self.ack_deadline = deadline;
        self
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}
