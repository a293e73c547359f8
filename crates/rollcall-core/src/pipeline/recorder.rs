//! Attendance recording: arrivals and detection audit entries.

use chrono::{DateTime, Local};
use tracing::{debug, info};

use crate::error::RollcallResult;
use crate::traits::{ArrivalStore, DetectionStore};
use crate::types::{DetectionRecord, Identity, NewArrival, Sighting, Timeliness};

/// Create the identity's arrival for the day and return its id.
///
/// Callers must have confirmed there is no arrival for the day yet.
pub async fn record_arrival(
    store: &dyn ArrivalStore,
    identity: &Identity,
    arrived_at: DateTime<Local>,
    scanner_id: &str,
    timeliness: Timeliness,
) -> RollcallResult<String> {
    let arrival = NewArrival::new(identity, arrived_at, scanner_id, timeliness);
    let id = store.create_arrival(&arrival).await?;

    info!(
        arrival_id = %id,
        identity = %identity.name,
        time = %arrived_at.format("%H:%M:%S"),
        status = %timeliness,
        "Arrival recorded"
    );
    Ok(id)
}

/// Append the audit entry for a resolved sighting and return its id.
pub async fn record_detection(
    store: &dyn DetectionStore,
    sighting: &Sighting,
    identity: &Identity,
    detected_at: DateTime<Local>,
) -> RollcallResult<String> {
    let record = DetectionRecord::resolved(sighting, identity, detected_at);
    let id = store.create_detection(&record).await?;

    debug!(
        detection_id = %id,
        identity_id = %identity.id,
        address = %record.hardware_address,
        rssi = record.rssi,
        device_type = %record.device_type,
        "Detection saved"
    );
    Ok(id)
}
