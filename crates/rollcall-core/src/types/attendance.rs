//! Arrival and detection records.

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{normalize_address, Identity, Sighting};

/// On-time / late classification of an arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeliness {
    OnTime,
    /// `minutes` is `None` when lateness could not be computed.
    Late { minutes: Option<i64> },
}

impl Timeliness {
    /// Storage form, shared by every store adapter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeliness::OnTime => "ontime",
            Timeliness::Late { .. } => "late",
        }
    }

    /// Parse the storage form. Lateness minutes are not stored.
    pub fn from_stored(value: &str) -> Option<Self> {
        match value {
            "ontime" => Some(Timeliness::OnTime),
            "late" => Some(Timeliness::Late { minutes: None }),
            _ => None,
        }
    }

    pub fn is_late(&self) -> bool {
        matches!(self, Timeliness::Late { .. })
    }

    /// Human-readable status line.
    pub fn describe(&self) -> String {
        match self {
            Timeliness::OnTime => "On time".to_string(),
            Timeliness::Late { minutes: Some(1) } => "Late by 1 minute".to_string(),
            Timeliness::Late { minutes: Some(m) } => format!("Late by {} minutes", m),
            Timeliness::Late { minutes: None } => "Late".to_string(),
        }
    }
}

impl fmt::Display for Timeliness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Arrival about to be written. The store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewArrival {
    pub identity_id: String,
    pub arrived_at: DateTime<Local>,
    pub scanner_id: String,
    pub timeliness: Timeliness,
    /// Dedup key: the local calendar day the arrival belongs to.
    pub day: NaiveDate,
}

impl NewArrival {
    pub fn new(
        identity: &Identity,
        arrived_at: DateTime<Local>,
        scanner_id: impl Into<String>,
        timeliness: Timeliness,
    ) -> Self {
        Self {
            identity_id: identity.id.clone(),
            arrived_at,
            scanner_id: scanner_id.into(),
            timeliness,
            day: arrived_at.date_naive(),
        }
    }
}

/// A stored first-arrival-of-day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrivalEvent {
    pub id: String,
    pub identity_id: String,
    pub arrived_at: DateTime<Local>,
    pub scanner_id: String,
    pub timeliness: Timeliness,
    pub day: NaiveDate,
}

/// Audit entry for a sighting that resolved to a known identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub identity_id: String,
    pub hardware_address: String,
    pub scanner_id: String,
    pub rssi: i32,
    pub device_type: String,
    pub is_known_tag: bool,
    pub resolved: bool,
    pub resolved_name: String,
    pub detected_at: DateTime<Local>,
}

impl DetectionRecord {
    /// Capture the full context of a resolved sighting.
    pub fn resolved(sighting: &Sighting, identity: &Identity, detected_at: DateTime<Local>) -> Self {
        Self {
            identity_id: identity.id.clone(),
            hardware_address: normalize_address(&sighting.hardware_address),
            scanner_id: sighting.scanner_id.clone(),
            rssi: sighting.rssi,
            device_type: sighting.device_type.clone(),
            is_known_tag: sighting.is_known_tag,
            resolved: true,
            resolved_name: identity.name.clone(),
            detected_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timeliness_storage_form() {
        assert_eq!(Timeliness::OnTime.as_str(), "ontime");
        assert_eq!(Timeliness::Late { minutes: Some(6) }.as_str(), "late");
        assert_eq!(Timeliness::from_stored("ontime"), Some(Timeliness::OnTime));
        assert_eq!(
            Timeliness::from_stored("late"),
            Some(Timeliness::Late { minutes: None })
        );
        assert_eq!(Timeliness::from_stored("absent"), None);
    }

    #[test]
    fn test_timeliness_describe() {
        assert_eq!(Timeliness::OnTime.describe(), "On time");
        assert_eq!(Timeliness::Late { minutes: Some(1) }.describe(), "Late by 1 minute");
        assert_eq!(Timeliness::Late { minutes: Some(30) }.describe(), "Late by 30 minutes");
        assert_eq!(Timeliness::Late { minutes: None }.describe(), "Late");
    }

    #[test]
    fn test_new_arrival_day_key() {
        let identity = Identity::new("e1", "Somchai", "aa", "08:00:00");
        let at = Local.with_ymd_and_hms(2026, 2, 1, 8, 3, 0).unwrap();
        let arrival = NewArrival::new(&identity, at, "S1", Timeliness::OnTime);
        assert_eq!(arrival.day, NaiveDate::from_ymd_opt(2026, 2, 1).unwrap());
        assert_eq!(arrival.identity_id, "e1");
    }

    #[test]
    fn test_detection_record_captures_sighting() {
        let identity = Identity::new("e1", "Somchai", "aa:bb", "08:00:00");
        let sighting = Sighting::new("S1", "AA:BB", -65)
            .with_device_type("iTag03")
            .with_known_tag(true);
        let at = Local.with_ymd_and_hms(2026, 2, 1, 8, 3, 0).unwrap();

        let record = DetectionRecord::resolved(&sighting, &identity, at);
        assert_eq!(record.hardware_address, "aa:bb");
        assert_eq!(record.rssi, -65);
        assert_eq!(record.device_type, "iTag03");
        assert!(record.is_known_tag);
        assert!(record.resolved);
        assert_eq!(record.resolved_name, "Somchai");
    }
}
