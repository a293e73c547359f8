//! Known, trackable identities.

use serde::{Deserialize, Serialize};

/// A registered person or entity whose beacon the scanners look for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub name: String,
    /// Lookup key. Stored lower-cased.
    pub hardware_address: String,
    /// Where personal notifications go. Empty means "no recipient".
    #[serde(default)]
    pub recipient: String,
    /// Expected arrival time-of-day as `HH:MM:SS`. Kept raw: a malformed value
    /// must never block an arrival.
    pub expected_start: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Identity {
    /// Create an active identity with no recipient.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        hardware_address: impl Into<String>,
        expected_start: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            hardware_address: normalize_address(&hardware_address.into()),
            recipient: String::new(),
            expected_start: expected_start.into(),
            active: true,
        }
    }

    /// Set the notification recipient handle.
    pub fn with_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = recipient.into();
        self
    }

    /// Set the active flag.
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }
}

/// Canonical form of a hardware address used for lookups.
pub fn normalize_address(address: &str) -> String {
    address.trim().to_lowercase()
}
