// ⚠️ Error Taxonomy - Row rejections vs batch failures
//
// Row-level rejections are expected and only counted.
// Batch-level failures abort the whole upload before anything is written.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// ROW-LEVEL REJECTION
// ============================================================================

/// Why a single candidate row was rejected (first failing rule wins)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectionKind {
    /// Account id is not a positive integer or no such account exists
    UnknownAccount,

    /// Value text is not exactly five decimal digits
    MalformedValue,

    /// Timestamp text is not `dd/mm/yyyy HH:MM`
    MalformedTimestamp,

    /// A reading already exists for this account and timestamp
    DuplicateReading,

    /// A newer reading already exists for this account
    OutOfOrderReading,
}

impl RejectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionKind::UnknownAccount => "UnknownAccount",
            RejectionKind::MalformedValue => "MalformedValue",
            RejectionKind::MalformedTimestamp => "MalformedTimestamp",
            RejectionKind::DuplicateReading => "DuplicateReading",
            RejectionKind::OutOfOrderReading => "OutOfOrderReading",
        }
    }

    /// Human-readable message for logs and CLI output
    pub fn message(&self) -> &'static str {
        match self {
            RejectionKind::UnknownAccount => "Account ID does not exist",
            RejectionKind::MalformedValue => {
                "Meter reading value must be in the format NNNNN (5 digits)"
            }
            RejectionKind::MalformedTimestamp => {
                "Meter reading date must be in the format dd/mm/yyyy HH:MM"
            }
            RejectionKind::DuplicateReading => {
                "A reading with this account ID and date already exists"
            }
            RejectionKind::OutOfOrderReading => "A newer reading already exists for this account",
        }
    }
}

impl std::fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// STORE ERRORS
// ============================================================================

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Stored timestamp is unreadable: {value}")]
    CorruptTimestamp { value: String },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

// ============================================================================
// BATCH-LEVEL FAILURE
// ============================================================================

#[derive(Error, Debug)]
pub enum IngestError {
    /// Caller error, raised before any processing
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to decode CSV input: {0}")]
    Decode(#[from] csv::Error),

    #[error("Store lookup failed: {0}")]
    Lookup(#[source] StoreError),

    #[error("Commit failed, no readings were persisted: {0}")]
    Commit(#[source] StoreError),

    #[error("Ingestion cancelled before commit")]
    Cancelled,
}

impl IngestError {
    /// True for errors caused by the caller rather than the pipeline
    pub fn is_input_error(&self) -> bool {
        matches!(self, IngestError::InvalidInput(_))
    }
}

pub type IngestResult<T> = std::result::Result<T, IngestError>;
