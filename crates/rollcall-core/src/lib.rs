//! rollcall-core - Core library for rollcall.
//!
//! This crate turns raw proximity sightings from BLE scanners into at most one
//! arrival per identity per day, classified as on time or late, with
//! best-effort notifications.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use rollcall_core::{Collaborators, DetectionPipeline, RollcallConfig, Sighting, SqliteStore};
//!
//! let config = RollcallConfig::from_env()?;
//! let store = Arc::new(SqliteStore::new(&config.store.sqlite_path)?);
//! let pipeline = DetectionPipeline::new(Collaborators::from_store(store, notifier), &config.pipeline);
//!
//! let sighting = Sighting::new("A1", "aa:bb:cc:dd:ee:ff", -60);
//! let outcome = pipeline.process(&sighting, &CancellationToken::new()).await?;
//! ```

pub mod config;
pub mod error;
pub mod pipeline;
pub mod store;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use config::{
    PipelineConfig, PocketBaseConfig, RollcallConfig, ServerConfig, StoreConfig, StoreProvider,
    TelegramConfig,
};
pub use error::{ErrorCode, RollcallError, RollcallResult, Stage};
pub use pipeline::{
    ArrivalReceipt, Collaborators, Delivery, DeliveryReport, DetectionOutcome, DetectionPipeline,
    IgnoreReason,
};
pub use store::SqliteStore;
pub use traits::{
    ArrivalStore, Clock, DetectionStore, Dispatch, FixedClock, IdentityStore, Notifier,
    SystemClock,
};
pub use types::{
    normalize_address, ArrivalEvent, DetectionRecord, Identity, NewArrival, Sighting, Timeliness,
};
