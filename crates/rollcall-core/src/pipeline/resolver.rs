//! Identity resolution: hardware address to active identity.

use tracing::debug;

use crate::error::RollcallResult;
use crate::traits::IdentityStore;
use crate::types::{normalize_address, Identity};

/// Resolve a hardware address to an active identity.
///
/// The address is normalized before the store is asked, so lookups are
/// case-insensitive regardless of how the scanner reported it. Inactive
/// identities resolve to `None`, the same as unregistered devices.
pub async fn resolve_identity(
    store: &dyn IdentityStore,
    hardware_address: &str,
) -> RollcallResult<Option<Identity>> {
    let key = normalize_address(hardware_address);
    if key.is_empty() {
        return Ok(None);
    }

    match store.find_by_hardware_address(&key).await? {
        Some(identity) if identity.active => Ok(Some(identity)),
        Some(identity) => {
            debug!(identity_id = %identity.id, address = %key, "Identity is inactive");
            Ok(None)
        }
        None => Ok(None),
    }
}
