//! Error types for rollcall operations.
//!
//! Store and notifier adapters report failures through [`RollcallError`]. The
//! pipeline wraps collaborator failures in [`RollcallError::Stage`] so callers
//! can tell which step of a sighting's processing broke.

use std::fmt;
use thiserror::Error;

/// Result type alias for rollcall operations.
pub type RollcallResult<T> = Result<T, RollcallError>;

/// Main error type for all rollcall operations.
#[derive(Error, Debug)]
pub enum RollcallError {
    /// A collaborator call failed while the pipeline was in the given stage.
    #[error("{stage} failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<RollcallError>,
    },

    /// Store rejected an arrival because one already exists for that day.
    #[error("Arrival already recorded for identity '{identity_id}' on {day}")]
    DuplicateArrival { identity_id: String, day: String },

    /// Store operation failed.
    #[error("Store error: {message}")]
    Store {
        message: String,
        code: ErrorCode,
        status: Option<u16>,
    },

    /// Database operation failed.
    #[error("Database error: {message}")]
    Database {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Network error.
    #[error("Network error: {message}")]
    Network {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Notification delivery failed.
    #[error("Notification error: {message}")]
    Notification { message: String, code: ErrorCode },

    /// Parse error.
    #[error("Parse error: {message}")]
    Parse { message: String, code: ErrorCode },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Processing was cancelled before the next step was issued.
    #[error("Processing cancelled before {0}")]
    Cancelled(Stage),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Pipeline step a collaborator call belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resolve,
    RecordDetection,
    DedupCheck,
    RecordArrival,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Resolve => "resolve",
            Stage::RecordDetection => "record_detection",
            Stage::DedupCheck => "dedup_check",
            Stage::RecordArrival => "record_arrival",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Store (STORE_xxx)
    StoreRequestFailed,
    StoreUnexpectedStatus,
    StoreDuplicate,

    // Database (DB_xxx)
    DbConnectionFailed,
    DbOperationFailed,

    // Network (NET_xxx)
    NetTimeout,
    NetConnectionFailed,

    // Notification (NOTIFY_xxx)
    NotifyDeliveryFailed,
    NotifyRejected,

    // Parse (PARSE_xxx)
    ParseInvalidJson,
    ParseInvalidTimestamp,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::StoreRequestFailed => "STORE_001",
            ErrorCode::StoreUnexpectedStatus => "STORE_002",
            ErrorCode::StoreDuplicate => "STORE_003",
            ErrorCode::DbConnectionFailed => "DB_001",
            ErrorCode::DbOperationFailed => "DB_002",
            ErrorCode::NetTimeout => "NET_001",
            ErrorCode::NetConnectionFailed => "NET_002",
            ErrorCode::NotifyDeliveryFailed => "NOTIFY_001",
            ErrorCode::NotifyRejected => "NOTIFY_002",
            ErrorCode::ParseInvalidJson => "PARSE_001",
            ErrorCode::ParseInvalidTimestamp => "PARSE_002",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl RollcallError {
    /// Wrap a collaborator failure with the stage it happened in.
    pub fn at_stage(stage: Stage, source: RollcallError) -> Self {
        Self::Stage {
            stage,
            source: Box::new(source),
        }
    }

    /// Create a store error from a non-success response.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
            code: ErrorCode::StoreRequestFailed,
            status: None,
        }
    }

    /// Create a store error carrying the HTTP status the store answered with.
    pub fn store_status(status: u16, message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
            code: ErrorCode::StoreUnexpectedStatus,
            status: Some(status),
        }
    }

    /// Create a duplicate-arrival error.
    pub fn duplicate_arrival(identity_id: impl Into<String>, day: impl fmt::Display) -> Self {
        Self::DuplicateArrival {
            identity_id: identity_id.into(),
            day: day.to_string(),
        }
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            code: ErrorCode::DbOperationFailed,
            source: None,
        }
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            code: ErrorCode::NetConnectionFailed,
            source: None,
        }
    }

    /// Create a network timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            code: ErrorCode::NetTimeout,
            source: None,
        }
    }

    /// Create a notification delivery error.
    pub fn notification(message: impl Into<String>) -> Self {
        Self::Notification {
            message: message.into(),
            code: ErrorCode::NotifyDeliveryFailed,
        }
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            code: ErrorCode::ParseInvalidJson,
        }
    }

    /// Get the error code. Stage wrappers report their source's code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Stage { source, .. } => source.code(),
            Self::DuplicateArrival { .. } => ErrorCode::StoreDuplicate,
            Self::Store { code, .. } => *code,
            Self::Database { code, .. } => *code,
            Self::Network { code, .. } => *code,
            Self::Notification { code, .. } => *code,
            Self::Parse { code, .. } => *code,
            _ => ErrorCode::Internal,
        }
    }

    /// The stage this error was raised in, if the pipeline tagged it.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            Self::Cancelled(stage) => Some(*stage),
            _ => None,
        }
    }

    /// Whether this is a store uniqueness conflict on an arrival, at any depth.
    pub fn is_duplicate_arrival(&self) -> bool {
        match self {
            Self::DuplicateArrival { .. } => true,
            Self::Stage { source, .. } => source.is_duplicate_arrival(),
            _ => false,
        }
    }
}

impl From<rusqlite::Error> for RollcallError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database {
            message: err.to_string(),
            code: ErrorCode::DbOperationFailed,
            source: Some(Box::new(err)),
        }
    }
}
