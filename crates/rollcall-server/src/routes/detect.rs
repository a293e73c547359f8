//! Sighting ingestion endpoint.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{debug, info, warn};

use rollcall_core::error::{RollcallError, RollcallResult};
use rollcall_core::pipeline::DetectionOutcome;
use rollcall_core::types::Sighting;

use crate::error::ApiResult;
use crate::state::AppState;

/// Response to a scanner once its sighting decoded.
///
/// Scanners cannot act on pipeline failures, so every processed sighting is
/// acknowledged with `200 OK`. A failure is logged here and goes no further.
#[derive(Debug)]
pub enum Acknowledgement {
    Processed(&'static str),
    Swallowed(RollcallError),
    /// The ack deadline passed; the sighting keeps running on its task.
    Detached,
}

impl Acknowledgement {
    pub fn from_result(result: RollcallResult<DetectionOutcome>) -> Self {
        match result {
            Ok(outcome) => {
                debug!(outcome = outcome.label(), "Sighting processed");
                Acknowledgement::Processed(outcome.label())
            }
            Err(e) => {
                warn!(
                    error = %e,
                    code = e.code().as_str(),
                    stage = e.stage().map(|s| s.as_str()),
                    "Error processing sighting"
                );
                Acknowledgement::Swallowed(e)
            }
        }
    }
}

impl IntoResponse for Acknowledgement {
    fn into_response(self) -> Response {
        (StatusCode::OK, "OK").into_response()
    }
}

/// Accept a sighting from a scanner.
/// POST /api/detect
pub async fn detect(State(state): State<AppState>, body: Bytes) -> ApiResult<Acknowledgement> {
    let sighting: Sighting = serde_json::from_slice(&body).map_err(RollcallError::from)?;

    if sighting.is_known_tag {
        info!(
            scanner = %sighting.scanner_id,
            address = %sighting.hardware_address,
            rssi = sighting.rssi,
            "Known tag detected"
        );
    } else {
        debug!(
            scanner = %sighting.scanner_id,
            address = %sighting.hardware_address,
            rssi = sighting.rssi,
            device_type = %sighting.device_type,
            "Sighting received"
        );
    }

    // Runs detached so a disconnecting scanner does not abort in-flight writes.
    let pipeline = state.pipeline.clone();
    let cancel = state.shutdown.child_token();
    let task = state
        .tasks
        .spawn(async move { pipeline.process(&sighting, &cancel).await });

    // Dropping the handle on timeout detaches the task; the tracker still waits for it.
    let result = match tokio::time::timeout(state.ack_deadline, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => Err(RollcallError::Internal(format!(
            "Sighting task failed: {}",
            e
        ))),
        Err(_) => {
            info!(
                deadline_ms = state.ack_deadline.as_millis() as u64,
                "Sighting still processing, acknowledging early"
            );
            return Ok(Acknowledgement::Detached);
        }
    };

    Ok(Acknowledgement::from_result(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_core::error::Stage;
    use rollcall_core::pipeline::IgnoreReason;

    #[test]
    fn test_outcome_is_processed() {
        let ack = Acknowledgement::from_result(Ok(DetectionOutcome::Ignored(
            IgnoreReason::UnknownIdentity,
        )));
        assert!(matches!(ack, Acknowledgement::Processed("ignored_unknown_identity")));
    }

    #[test]
    fn test_failure_is_swallowed_but_acknowledged() {
        let ack = Acknowledgement::from_result(Err(RollcallError::at_stage(
            Stage::DedupCheck,
            RollcallError::network("down"),
        )));
        assert!(matches!(
            &ack,
            Acknowledgement::Swallowed(e) if e.stage() == Some(Stage::DedupCheck)
        ));
        assert_eq!(ack.into_response().status(), StatusCode::OK);
    }

    #[test]
    fn test_detached_is_acknowledged() {
        assert_eq!(
            Acknowledgement::Detached.into_response().status(),
            StatusCode::OK
        );
    }
}
