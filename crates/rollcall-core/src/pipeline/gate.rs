//! Proximity gate.

/// Whether a signal is strong enough. Larger (closer to zero) is nearer.
pub fn passes(rssi: i32, threshold: i32) -> bool {
    rssi >= threshold
}

/// Signal-strength admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProximityGate {
    threshold: i32,
}

impl ProximityGate {
    pub fn new(threshold: i32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> i32 {
        self.threshold
    }

    /// A sighting is admitted unless its signal is strictly weaker than the threshold.
    pub fn admits(&self, rssi: i32) -> bool {
        passes(rssi, self.threshold)
    }
}
