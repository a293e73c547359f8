//! Raw scanner observations.

use serde::{Deserialize, Serialize};

/// One proximity observation reported by a scanner.
///
/// Field names follow the scanner firmware's JSON payload. Extra fields the
/// firmware sends (its own target-device guess, a device name) are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sighting {
    /// Identifier of the scanner that saw the device.
    #[serde(rename = "scanner_mac")]
    pub scanner_id: String,
    /// Observed hardware address, in whatever case the scanner reported it.
    #[serde(rename = "mac_address")]
    pub hardware_address: String,
    /// Received signal strength in dBm. Larger (closer to zero) is nearer.
    pub rssi: i32,
    /// Opaque device-type label computed by the firmware.
    #[serde(default)]
    pub device_type: String,
    /// Whether the firmware matched a known tag pattern.
    #[serde(rename = "itag03", default)]
    pub is_known_tag: bool,
}

impl Sighting {
    /// Create a sighting with no device-type label.
    pub fn new(
        scanner_id: impl Into<String>,
        hardware_address: impl Into<String>,
        rssi: i32,
    ) -> Self {
        Self {
            scanner_id: scanner_id.into(),
            hardware_address: hardware_address.into(),
            rssi,
            device_type: String::new(),
            is_known_tag: false,
        }
    }

    /// Set the firmware's device-type label.
    pub fn with_device_type(mut self, device_type: impl Into<String>) -> Self {
        self.device_type = device_type.into();
        self
    }

    /// Set the known-tag flag.
    pub fn with_known_tag(mut self, is_known_tag: bool) -> Self {
        self.is_known_tag = is_known_tag;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_firmware_payload() {
        let json = r#"{
            "scanner_mac": "AA:BB:CC:DD:EE:FF",
            "mac_address": "11:22:33:44:55:66",
            "rssi": -50,
            "device_type": "iTag03",
            "itag03": true,
            "target_device": false,
            "device_name": ""
        }"#;

        let sighting: Sighting = serde_json::from_str(json).unwrap();
        assert_eq!(sighting.scanner_id, "AA:BB:CC:DD:EE:FF");
        assert_eq!(sighting.hardware_address, "11:22:33:44:55:66");
        assert_eq!(sighting.rssi, -50);
        assert_eq!(sighting.device_type, "iTag03");
        assert!(sighting.is_known_tag);
    }

    #[test]
    fn test_optional_fields_default() {
        let json = r#"{"scanner_mac": "S1", "mac_address": "aa", "rssi": -60}"#;
        let sighting: Sighting = serde_json::from_str(json).unwrap();
        assert_eq!(sighting, Sighting::new("S1", "aa", -60));
    }
}
