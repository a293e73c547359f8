//! Timeliness classification of arrivals.
//!
//! The expected start is a time-of-day. It is placed on the arrival's own
//! calendar date, in the arrival's time zone, before comparing. Bad expected
//! start values never penalize an arrival: they classify as on time.

use chrono::{DateTime, Duration, NaiveTime, TimeZone};

use crate::types::Timeliness;

/// Format of an identity's expected start time.
pub const EXPECTED_START_FORMAT: &str = "%H:%M:%S";

/// Parse an `HH:MM:SS` expected start time.
pub fn parse_expected_start(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), EXPECTED_START_FORMAT).ok()
}

/// The expected start instant on the arrival's calendar date.
///
/// `None` if the value is malformed or the local time does not exist that day.
pub fn expected_start_on<Tz: TimeZone>(
    arrival: &DateTime<Tz>,
    expected_start: &str,
) -> Option<DateTime<Tz>> {
    let start = parse_expected_start(expected_start)?;
    arrival
        .timezone()
        .from_local_datetime(&arrival.date_naive().and_time(start))
        .earliest()
}

/// Classify an arrival against an expected start and grace period.
///
/// On time iff the arrival is strictly before expected start plus grace.
/// Late arrivals carry the whole minutes elapsed since the expected start.
pub fn classify<Tz: TimeZone>(
    arrival: &DateTime<Tz>,
    expected_start: &str,
    grace: Duration,
) -> Timeliness {
    let Some(expected) = expected_start_on(arrival, expected_start) else {
        return Timeliness::OnTime;
    };

    let Some(deadline) = expected.clone().checked_add_signed(grace) else {
        return Timeliness::OnTime;
    };

    if *arrival < deadline {
        Timeliness::OnTime
    } else {
        // Whole minutes since the expected start, truncated toward zero.
        Timeliness::Late {
            minutes: Some(arrival.clone().signed_duration_since(expected).num_minutes()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Local};

    fn at(h: u32, m: u32, s: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(7 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 2, 1, h, m, s)
            .unwrap()
    }

    fn grace() -> Duration {
        Duration::minutes(5)
    }

    #[test]
    fn test_classification_table() {
        let cases = [
            ("exactly at start", at(8, 0, 0), Timeliness::OnTime),
            ("within grace", at(8, 4, 0), Timeliness::OnTime),
            ("last second of grace", at(8, 4, 59), Timeliness::OnTime),
            ("before start", at(7, 45, 0), Timeliness::OnTime),
            ("exactly at grace end", at(8, 5, 0), Timeliness::Late { minutes: Some(5) }),
            ("one second past grace", at(8, 5, 1), Timeliness::Late { minutes: Some(5) }),
            ("six minutes", at(8, 6, 0), Timeliness::Late { minutes: Some(6) }),
            ("thirty minutes", at(8, 30, 0), Timeliness::Late { minutes: Some(30) }),
        ];

        for (name, arrival, want) in cases {
            assert_eq!(classify(&arrival, "08:00:00", grace()), want, "{}", name);
        }
    }

    #[test]
    fn test_lateness_truncates_toward_zero() {
        assert_eq!(
            classify(&at(8, 6, 59), "08:00:00", grace()),
            Timeliness::Late { minutes: Some(6) }
        );
    }

    #[test]
    fn test_malformed_start_is_on_time() {
        for raw in ["invalid", "", "25:00:00", "8am", "08:00"] {
            assert_eq!(classify(&at(11, 0, 0), raw, grace()), Timeliness::OnTime, "{raw}");
        }
    }

    #[test]
    fn test_expected_start_uses_arrival_date_and_zone() {
        let expected = expected_start_on(&at(9, 0, 0), "08:15:00").unwrap();
        assert_eq!(expected, at(8, 15, 0));
    }

    #[test]
    fn test_server_local_arrivals() {
        let arrival = Local.with_ymd_and_hms(2026, 2, 1, 8, 12, 30).unwrap();
        assert_eq!(
            classify(&arrival, "08:00:00", grace()),
            Timeliness::Late { minutes: Some(12) }
        );
        assert_eq!(
            classify(&arrival, "08:10:00", grace()),
            Timeliness::OnTime
        );
    }

    #[test]
    fn test_zero_grace() {
        assert_eq!(
            classify(&at(8, 0, 0), "08:00:00", Duration::zero()),
            Timeliness::Late { minutes: Some(0) }
        );
    }
}
