//! Persistence traits - every store adapter implements these.

use async_trait::async_trait;
use chrono::NaiveDate;

#[cfg(test)]
use mockall::automock;

use crate::error::RollcallResult;
use crate::types::{DetectionRecord, Identity, NewArrival};

/// Lookup of known identities.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Find the identity owning a (lower-cased) hardware address.
    ///
    /// `Ok(None)` means "not registered". Any other failure is an error.
    async fn find_by_hardware_address(&self, address: &str) -> RollcallResult<Option<Identity>>;
}

/// Arrival time-series.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ArrivalStore: Send + Sync {
    /// Whether an arrival exists for the identity on the given local day.
    async fn has_arrived_on(&self, identity_id: &str, day: NaiveDate) -> RollcallResult<bool>;

    /// Create an arrival and return its id.
    ///
    /// Stores that enforce one arrival per (identity, day) report a conflict
    /// as [`RollcallError::DuplicateArrival`](crate::error::RollcallError::DuplicateArrival).
    async fn create_arrival(&self, arrival: &NewArrival) -> RollcallResult<String>;
}

/// Append-only detection audit log.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DetectionStore: Send + Sync {
    /// Append a detection record and return its id.
    async fn create_detection(&self, record: &DetectionRecord) -> RollcallResult<String>;
}
