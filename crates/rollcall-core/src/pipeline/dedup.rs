//! Arrival deduplication by local calendar day.

use chrono::{DateTime, Local};

use crate::error::RollcallResult;
use crate::traits::ArrivalStore;
use crate::types::Identity;

/// Whether the identity already has an arrival on `now`'s local calendar day.
pub async fn already_arrived(
    store: &dyn ArrivalStore,
    identity: &Identity,
    now: DateTime<Local>,
) -> RollcallResult<bool> {
    store.has_arrived_on(&identity.id, now.date_naive()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RollcallError;
    use crate::traits::MockArrivalStore;
    use chrono::{NaiveDate, TimeZone};
    use mockall::predicate::eq;

    #[tokio::test]
    async fn test_checks_local_calendar_day() {
        let mut store = MockArrivalStore::new();
        store
            .expect_has_arrived_on()
            .with(eq("e1"), eq(NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()))
            .times(1)
            .returning(|_, _| Ok(true));

        let identity = Identity::new("e1", "Somchai", "aa", "08:00:00");
        let now = Local.with_ymd_and_hms(2026, 2, 1, 23, 59, 0).unwrap();
        assert!(already_arrived(&store, &identity, now).await.unwrap());
    }

    #[tokio::test]
    async fn test_failure_propagates() {
        let mut store = MockArrivalStore::new();
        store
            .expect_has_arrived_on()
            .returning(|_, _| Err(RollcallError::timeout("lookup timed out")));

        let identity = Identity::new("e1", "Somchai", "aa", "08:00:00");
        let now = Local.with_ymd_and_hms(2026, 2, 1, 8, 0, 0).unwrap();
        assert!(already_arrived(&store, &identity, now).await.is_err());
    }
}
