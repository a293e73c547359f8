//! SQLite-backed store for identities, arrivals and detections.
//!
//! One arrival per identity per day is enforced by a `UNIQUE` constraint, so
//! concurrent first sightings of the same identity cannot both be recorded.

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use crate::error::{ErrorCode, RollcallError, RollcallResult};
use crate::traits::{ArrivalStore, DetectionStore, IdentityStore};
use crate::types::{
    normalize_address, ArrivalEvent, DetectionRecord, Identity, NewArrival, Timeliness,
};

const DAY_FORMAT: &str = "%Y-%m-%d";

/// SQLite store implementing every persistence trait.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) a store at the given path. `:memory:` opens an in-memory store.
    pub fn new(db_path: impl AsRef<Path>) -> RollcallResult<Self> {
        let conn = if db_path.as_ref().to_str() == Some(":memory:") {
            Connection::open_in_memory()
        } else {
            if let Some(parent) = db_path.as_ref().parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            Connection::open(db_path.as_ref())
        }
        .map_err(|e| RollcallError::Database {
            message: format!("Failed to open {}: {}", db_path.as_ref().display(), e),
            code: ErrorCode::DbConnectionFailed,
            source: Some(Box::new(e)),
        })?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store.
    pub fn in_memory() -> RollcallResult<Self> {
        Self::new(":memory:")
    }

    fn conn(&self) -> RollcallResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| RollcallError::database("connection mutex poisoned"))
    }

    fn init_schema(&self) -> RollcallResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS identities (
                id               TEXT PRIMARY KEY,
                name             TEXT NOT NULL,
                hardware_address TEXT NOT NULL UNIQUE,
                recipient        TEXT NOT NULL DEFAULT '',
                expected_start   TEXT NOT NULL,
                active           INTEGER NOT NULL DEFAULT 1
            );

            CREATE TABLE IF NOT EXISTS arrivals (
                id           TEXT PRIMARY KEY,
                identity_id  TEXT NOT NULL,
                arrived_at   TEXT NOT NULL,
                scanner_id   TEXT NOT NULL,
                status       TEXT NOT NULL,
                created_date TEXT NOT NULL,
                UNIQUE (identity_id, created_date)
            );

            CREATE TABLE IF NOT EXISTS detections (
                id               TEXT PRIMARY KEY,
                identity_id      TEXT NOT NULL,
                hardware_address TEXT NOT NULL,
                scanner_id       TEXT NOT NULL,
                rssi             INTEGER NOT NULL,
                device_type      TEXT NOT NULL,
                is_known_tag     INTEGER NOT NULL,
                resolved         INTEGER NOT NULL,
                resolved_name    TEXT NOT NULL,
                detected_at      TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_arrivals_date ON arrivals(created_date);
            CREATE INDEX IF NOT EXISTS idx_detections_identity ON detections(identity_id);
            "#,
        )?;
        Ok(())
    }

    /// Register an identity. Fails if its hardware address is already taken.
    pub fn register_identity(&self, identity: &Identity) -> RollcallResult<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO identities (id, name, hardware_address, recipient, expected_start, active)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                identity.id,
                identity.name,
                normalize_address(&identity.hardware_address),
                identity.recipient,
                identity.expected_start,
                identity.active as i32,
            ],
        )?;
        Ok(())
    }

    /// Look up an identity by (normalized) hardware address.
    pub fn identity_by_address(&self, address: &str) -> RollcallResult<Option<Identity>> {
        let conn = self.conn()?;
        let identity = conn
            .query_row(
                r#"
                SELECT id, name, hardware_address, recipient, expected_start, active
                FROM identities
                WHERE hardware_address = ?1
                "#,
                [normalize_address(address)],
                |row| {
                    Ok(Identity {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        hardware_address: row.get(2)?,
                        recipient: row.get(3)?,
                        expected_start: row.get(4)?,
                        active: row.get::<_, i32>(5)? != 0,
                    })
                },
            )
            .optional()?;
        Ok(identity)
    }

    /// Whether an arrival exists for the identity on the day.
    pub fn arrival_exists(&self, identity_id: &str, day: NaiveDate) -> RollcallResult<bool> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM arrivals WHERE identity_id = ?1 AND created_date = ?2",
            params![identity_id, day.format(DAY_FORMAT).to_string()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Insert an arrival, mapping the per-day uniqueness conflict to
    /// [`RollcallError::DuplicateArrival`].
    pub fn insert_arrival(&self, arrival: &NewArrival) -> RollcallResult<String> {
        let conn = self.conn()?;
        let id = Uuid::new_v4().to_string();

        let result = conn.execute(
            r#"
            INSERT INTO arrivals (id, identity_id, arrived_at, scanner_id, status, created_date)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                id,
                arrival.identity_id,
                arrival.arrived_at.to_rfc3339(),
                arrival.scanner_id,
                arrival.timeliness.as_str(),
                arrival.day.format(DAY_FORMAT).to_string(),
            ],
        );

        match result {
            Ok(_) => Ok(id),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(RollcallError::duplicate_arrival(
                    arrival.identity_id.clone(),
                    arrival.day,
                ))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// All arrivals recorded for a day, earliest first.
    pub fn arrivals_on(&self, day: NaiveDate) -> RollcallResult<Vec<ArrivalEvent>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, identity_id, arrived_at, scanner_id, status, created_date
            FROM arrivals
            WHERE created_date = ?1
            ORDER BY arrived_at ASC
            "#,
        )?;

        let rows = stmt.query_map([day.format(DAY_FORMAT).to_string()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut arrivals = Vec::new();
        for row in rows {
            let (id, identity_id, arrived_at, scanner_id, status, created_date) = row?;
            arrivals.push(ArrivalEvent {
                id,
                identity_id,
                arrived_at: parse_timestamp(&arrived_at)?,
                scanner_id,
                timeliness: Timeliness::from_stored(&status).ok_or_else(|| {
                    RollcallError::parse(format!("Unknown arrival status '{}'", status))
                })?,
                day: NaiveDate::parse_from_str(&created_date, DAY_FORMAT).map_err(|e| {
                    RollcallError::Parse {
                        message: format!("Invalid created_date '{}': {}", created_date, e),
                        code: ErrorCode::ParseInvalidTimestamp,
                    }
                })?,
            });
        }
        Ok(arrivals)
    }

    /// Append a detection record.
    pub fn insert_detection(&self, record: &DetectionRecord) -> RollcallResult<String> {
        let conn = self.conn()?;
        let id = Uuid::new_v4().to_string();

        conn.execute(
            r#"
            INSERT INTO detections (
                id, identity_id, hardware_address, scanner_id, rssi,
                device_type, is_known_tag, resolved, resolved_name, detected_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                id,
                record.identity_id,
                normalize_address(&record.hardware_address),
                record.scanner_id,
                record.rssi,
                record.device_type,
                record.is_known_tag as i32,
                record.resolved as i32,
                record.resolved_name,
                record.detected_at.to_rfc3339(),
            ],
        )?;

        Ok(id)
    }

    /// Total number of detection records.
    pub fn detection_count(&self) -> RollcallResult<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM detections", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Detection records for an identity, oldest first.
    pub fn detections_for(&self, identity_id: &str) -> RollcallResult<Vec<DetectionRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT identity_id, hardware_address, scanner_id, rssi, device_type,
                   is_known_tag, resolved, resolved_name, detected_at
            FROM detections
            WHERE identity_id = ?1
            ORDER BY detected_at ASC
            "#,
        )?;

        let rows = stmt.query_map([identity_id], DetectionRow::from_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?.into_record()?);
        }
        Ok(records)
    }
}

/// Raw detection row. Row closures can only fail with `rusqlite::Error`, so
/// the timestamp is parsed afterwards.
struct DetectionRow {
    identity_id: String,
    hardware_address: String,
    scanner_id: String,
    rssi: i32,
    device_type: String,
    is_known_tag: bool,
    resolved: bool,
    resolved_name: String,
    detected_at: String,
}

impl DetectionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            identity_id: row.get(0)?,
            hardware_address: row.get(1)?,
            scanner_id: row.get(2)?,
            rssi: row.get(3)?,
            device_type: row.get(4)?,
            is_known_tag: row.get::<_, i32>(5)? != 0,
            resolved: row.get::<_, i32>(6)? != 0,
            resolved_name: row.get(7)?,
            detected_at: row.get(8)?,
        })
    }

    fn into_record(self) -> RollcallResult<DetectionRecord> {
        Ok(DetectionRecord {
            detected_at: parse_timestamp(&self.detected_at)?,
            identity_id: self.identity_id,
            hardware_address: self.hardware_address,
            scanner_id: self.scanner_id,
            rssi: self.rssi,
            device_type: self.device_type,
            is_known_tag: self.is_known_tag,
            resolved: self.resolved,
            resolved_name: self.resolved_name,
        })
    }
}

fn parse_timestamp(value: &str) -> RollcallResult<DateTime<Local>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Local))
        .map_err(|e| RollcallError::Parse {
            message: format!("Invalid timestamp '{}': {}", value, e),
            code: ErrorCode::ParseInvalidTimestamp,
        })
}

#[async_trait]
impl IdentityStore for SqliteStore {
    async fn find_by_hardware_address(&self, address: &str) -> RollcallResult<Option<Identity>> {
        self.identity_by_address(address)
    }
}

#[async_trait]
impl ArrivalStore for SqliteStore {
    async fn has_arrived_on(&self, identity_id: &str, day: NaiveDate) -> RollcallResult<bool> {
        self.arrival_exists(identity_id, day)
    }

    async fn create_arrival(&self, arrival: &NewArrival) -> RollcallResult<String> {
        self.insert_arrival(arrival)
    }
}

#[async_trait]
impl DetectionStore for SqliteStore {
    async fn create_detection(&self, record: &DetectionRecord) -> RollcallResult<String> {
        self.insert_detection(record)
    }
}
