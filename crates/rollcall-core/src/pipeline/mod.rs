//! Detection-to-attendance decision pipeline.
//!
//! A sighting flows one way through the stages:
//!
//! ```text
//! resolve -> audit write -> gate -> dedup -> classify -> record -> notify
//! ```
//!
//! Each stage either ends processing with an [`IgnoreReason`], fails with a
//! stage-tagged [`RollcallError`], or hands a refined value to the next one.
//! Nothing is retried here.

pub mod dedup;
pub mod gate;
pub mod notify;
pub mod recorder;
pub mod resolver;
pub mod timeliness;

use std::sync::Arc;

use chrono::{DateTime, Duration, Local};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::error::{RollcallError, RollcallResult, Stage};
use crate::traits::{ArrivalStore, Clock, DetectionStore, IdentityStore, Notifier, SystemClock};
use crate::types::{Sighting, Timeliness};

pub use gate::ProximityGate;
pub use notify::{ArrivalNotice, Delivery, DeliveryReport};

/// Everything the pipeline calls out to, built once at startup.
#[derive(Clone)]
pub struct Collaborators {
    pub identities: Arc<dyn IdentityStore>,
    pub arrivals: Arc<dyn ArrivalStore>,
    pub detections: Arc<dyn DetectionStore>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
}

impl Collaborators {
    /// Bundle collaborators with the system clock.
    pub fn new(
        identities: Arc<dyn IdentityStore>,
        arrivals: Arc<dyn ArrivalStore>,
        detections: Arc<dyn DetectionStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            identities,
            arrivals,
            detections,
            notifier,
            clock: Arc::new(SystemClock),
        }
    }

    /// Use one store for identities, arrivals and detections.
    pub fn from_store<S>(store: Arc<S>, notifier: Arc<dyn Notifier>) -> Self
    where
        S: IdentityStore + ArrivalStore + DetectionStore + 'static,
    {
        Self::new(store.clone(), store.clone(), store, notifier)
    }

    /// Replace the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// Why a sighting produced no arrival.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum IgnoreReason {
    /// No active identity owns the address. Nothing was written.
    UnknownIdentity,
    /// Signal weaker than the gate threshold. The detection was audited.
    TooFar { rssi: i32, threshold: i32 },
    /// The identity already arrived today. The detection was audited.
    AlreadyArrived,
}

/// A recorded arrival and what happened to its notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrivalReceipt {
    pub arrival_id: String,
    pub detection_id: String,
    pub identity_id: String,
    pub arrived_at: DateTime<Local>,
    pub timeliness: Timeliness,
    pub delivery: DeliveryReport,
}

/// Terminal state of a successfully processed sighting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectionOutcome {
    Ignored(IgnoreReason),
    Recorded(ArrivalReceipt),
}

impl DetectionOutcome {
    pub fn is_recorded(&self) -> bool {
        matches!(self, DetectionOutcome::Recorded(_))
    }

    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            DetectionOutcome::Ignored(IgnoreReason::UnknownIdentity) => "ignored_unknown_identity",
            DetectionOutcome::Ignored(IgnoreReason::TooFar { .. }) => "ignored_too_far",
            DetectionOutcome::Ignored(IgnoreReason::AlreadyArrived) => "ignored_already_arrived",
            DetectionOutcome::Recorded(_) => "recorded",
        }
    }
}

/// Sequences the pipeline stages for one sighting at a time.
///
/// Holds no per-sighting state, so one instance can serve concurrent requests.
pub struct DetectionPipeline {
    collaborators: Collaborators,
    gate: ProximityGate,
    grace: Duration,
}

impl DetectionPipeline {
    pub fn new(collaborators: Collaborators, config: &PipelineConfig) -> Self {
        Self {
            collaborators,
            gate: ProximityGate::new(config.rssi_threshold),
            grace: config.grace_period(),
        }
    }

    /// Process one sighting.
    ///
    /// `cancel` is checked before work starts and before the arrival write.
    /// Calls already issued are never interrupted.
    pub async fn process(
        &self,
        sighting: &Sighting,
        cancel: &CancellationToken,
    ) -> RollcallResult<DetectionOutcome> {
        if cancel.is_cancelled() {
            return Err(RollcallError::Cancelled(Stage::Resolve));
        }

        let c = &self.collaborators;

        let identity =
            match resolver::resolve_identity(c.identities.as_ref(), &sighting.hardware_address)
                .await
                .map_err(|e| RollcallError::at_stage(Stage::Resolve, e))?
            {
                Some(identity) => identity,
                None => return Ok(DetectionOutcome::Ignored(IgnoreReason::UnknownIdentity)),
            };

        info!(
            identity = %identity.name,
            address = %sighting.hardware_address,
            rssi = sighting.rssi,
            scanner = %sighting.scanner_id,
            "Known device detected"
        );

        let now = c.clock.now();

        let detection_id =
            recorder::record_detection(c.detections.as_ref(), sighting, &identity, now)
                .await
                .map_err(|e| RollcallError::at_stage(Stage::RecordDetection, e))?;

        if !self.gate.admits(sighting.rssi) {
            debug!(
                address = %sighting.hardware_address,
                rssi = sighting.rssi,
                threshold = self.gate.threshold(),
                "Device too far"
            );
            return Ok(DetectionOutcome::Ignored(IgnoreReason::TooFar {
                rssi: sighting.rssi,
                threshold: self.gate.threshold(),
            }));
        }

        if dedup::already_arrived(c.arrivals.as_ref(), &identity, now)
            .await
            .map_err(|e| RollcallError::at_stage(Stage::DedupCheck, e))?
        {
            debug!(identity_id = %identity.id, "Already arrived today");
            return Ok(DetectionOutcome::Ignored(IgnoreReason::AlreadyArrived));
        }

        let timeliness = timeliness::classify(&now, &identity.expected_start, self.grace);

        if cancel.is_cancelled() {
            return Err(RollcallError::Cancelled(Stage::RecordArrival));
        }

        let arrival_id = match recorder::record_arrival(
            c.arrivals.as_ref(),
            &identity,
            now,
            &sighting.scanner_id,
            timeliness,
        )
        .await
        {
            Ok(id) => id,
            Err(e) if e.is_duplicate_arrival() => {
                info!(identity_id = %identity.id, "Arrival was recorded concurrently");
                return Ok(DetectionOutcome::Ignored(IgnoreReason::AlreadyArrived));
            }
            Err(e) => return Err(RollcallError::at_stage(Stage::RecordArrival, e)),
        };

        let notice = ArrivalNotice {
            identity: &identity,
            arrived_at: now,
            scanner_id: &sighting.scanner_id,
            timeliness,
        };
        let delivery = notify::dispatch(c.notifier.as_ref(), &notice).await;

        Ok(DetectionOutcome::Recorded(ArrivalReceipt {
            arrival_id,
            detection_id,
            identity_id: identity.id,
            arrived_at: now,
            timeliness,
            delivery,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{
        FixedClock, MockArrivalStore, MockDetectionStore, MockIdentityStore, MockNotifier,
    };
    use crate::types::Identity;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 2, 1, h, m, 0).unwrap()
    }

    fn known_identity() -> MockIdentityStore {
        let mut identities = MockIdentityStore::new();
        identities.expect_find_by_hardware_address().returning(|addr| {
            Ok(Some(
                Identity::new("e1", "Somchai", addr, "08:00:00").with_recipient("555"),
            ))
        });
        identities
    }

    fn audited() -> MockDetectionStore {
        let mut detections = MockDetectionStore::new();
        detections
            .expect_create_detection()
            .times(1)
            .returning(|_| Ok("det-1".to_string()));
        detections
    }

    fn pipeline(
        identities: MockIdentityStore,
        arrivals: MockArrivalStore,
        detections: MockDetectionStore,
        notifier: MockNotifier,
        now: DateTime<Local>,
    ) -> DetectionPipeline {
        let collaborators = Collaborators::new(
            Arc::new(identities),
            Arc::new(arrivals),
            Arc::new(detections),
            Arc::new(notifier),
        )
        .with_clock(Arc::new(FixedClock(now)));
        DetectionPipeline::new(collaborators, &PipelineConfig::default())
    }

    #[tokio::test]
    async fn test_dedup_error_fails_closed() {
        let mut arrivals = MockArrivalStore::new();
        arrivals
            .expect_has_arrived_on()
            .returning(|_, _| Err(RollcallError::timeout("attendance lookup timed out")));
        arrivals.expect_create_arrival().times(0);
        let mut notifier = MockNotifier::new();
        notifier.expect_send_to_recipient().times(0);

        let p = pipeline(known_identity(), arrivals, audited(), notifier, at(8, 0));
        let err = p
            .process(&Sighting::new("S1", "AA", -50), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.stage(), Some(Stage::DedupCheck));
    }

    #[tokio::test]
    async fn test_resolve_error_is_stage_tagged() {
        let mut identities = MockIdentityStore::new();
        identities
            .expect_find_by_hardware_address()
            .returning(|_| Err(RollcallError::store_status(500, "boom")));
        let mut detections = MockDetectionStore::new();
        detections.expect_create_detection().times(0);

        let p = pipeline(
            identities,
            MockArrivalStore::new(),
            detections,
            MockNotifier::new(),
            at(8, 0),
        );
        let err = p
            .process(&Sighting::new("S1", "AA", -50), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Resolve));
    }

    #[tokio::test]
    async fn test_audit_failure_aborts_before_arrival() {
        let mut detections = MockDetectionStore::new();
        detections
            .expect_create_detection()
            .returning(|_| Err(RollcallError::store("insert failed")));
        let mut arrivals = MockArrivalStore::new();
        arrivals.expect_has_arrived_on().times(0);
        arrivals.expect_create_arrival().times(0);

        let p = pipeline(known_identity(), arrivals, detections, MockNotifier::new(), at(8, 0));
        let err = p
            .process(&Sighting::new("S1", "AA", -50), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.stage(), Some(Stage::RecordDetection));
    }

    #[tokio::test]
    async fn test_arrival_create_error_skips_notification() {
        let mut arrivals = MockArrivalStore::new();
        arrivals.expect_has_arrived_on().returning(|_, _| Ok(false));
        arrivals
            .expect_create_arrival()
            .returning(|_| Err(RollcallError::store_status(400, "bad record")));
        let mut notifier = MockNotifier::new();
        notifier.expect_send_to_recipient().times(0);
        notifier.expect_send_to_admin().times(0);

        let p = pipeline(known_identity(), arrivals, audited(), notifier, at(8, 30));
        let err = p
            .process(&Sighting::new("S1", "AA", -50), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.stage(), Some(Stage::RecordArrival));
    }

    #[tokio::test]
    async fn test_lost_race_is_already_arrived() {
        let mut arrivals = MockArrivalStore::new();
        arrivals.expect_has_arrived_on().returning(|_, _| Ok(false));
        arrivals
            .expect_create_arrival()
            .returning(|a| Err(RollcallError::duplicate_arrival(a.identity_id.clone(), a.day)));
        let mut notifier = MockNotifier::new();
        notifier.expect_send_to_recipient().times(0);

        let p = pipeline(known_identity(), arrivals, audited(), notifier, at(8, 0));
        let outcome = p
            .process(&Sighting::new("S1", "AA", -50), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome, DetectionOutcome::Ignored(IgnoreReason::AlreadyArrived));
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_fail() {
        let mut arrivals = MockArrivalStore::new();
        arrivals.expect_has_arrived_on().returning(|_, _| Ok(false));
        arrivals
            .expect_create_arrival()
            .returning(|_| Ok("arr-1".to_string()));
        let mut notifier = MockNotifier::new();
        notifier
            .expect_send_to_recipient()
            .returning(|_, _| Err(RollcallError::notification("bot blocked")));
        notifier
            .expect_send_to_admin()
            .returning(|_| Err(RollcallError::notification("admin chat missing")));

        let p = pipeline(known_identity(), arrivals, audited(), notifier, at(8, 30));
        let outcome = p
            .process(&Sighting::new("S1", "AA", -50), &CancellationToken::new())
            .await
            .unwrap();

        match outcome {
            DetectionOutcome::Recorded(receipt) => {
                assert_eq!(receipt.arrival_id, "arr-1");
                assert_eq!(receipt.timeliness, Timeliness::Late { minutes: Some(30) });
                assert!(matches!(receipt.delivery.recipient, Delivery::Failed(_)));
                assert!(matches!(receipt.delivery.admin, Some(Delivery::Failed(_))));
            }
            other => panic!("expected recorded arrival, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cancelled_before_start_touches_nothing() {
        let mut identities = MockIdentityStore::new();
        identities.expect_find_by_hardware_address().times(0);

        let p = pipeline(
            identities,
            MockArrivalStore::new(),
            MockDetectionStore::new(),
            MockNotifier::new(),
            at(8, 0),
        );
        let token = CancellationToken::new();
        token.cancel();

        let err = p
            .process(&Sighting::new("S1", "AA", -50), &token)
            .await
            .unwrap_err();
        assert!(matches!(err, RollcallError::Cancelled(Stage::Resolve)));
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(
            DetectionOutcome::Ignored(IgnoreReason::TooFar {
                rssi: -80,
                threshold: -70
            })
            .label(),
            "ignored_too_far"
        );
        assert!(!DetectionOutcome::Ignored(IgnoreReason::AlreadyArrived).is_recorded());
    }
}
