// Meter Readings - Core Library
// Exposes the ingestion pipeline for the CLI, the API server, and tests

pub mod error;
pub mod models;
pub mod decoder;    // CSV bytes → field maps
pub mod candidate;  // field map → candidate record
pub mod rules;      // five-rule validation
pub mod factory;    // accepted candidate → reading
pub mod ingest;     // pipeline + batch committer
pub mod store;
pub mod db;
pub mod seed;
pub mod config;

#[cfg(feature = "server")]
pub mod api;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use error::{IngestError, IngestResult, RejectionKind, StoreError};
pub use models::{Account, IngestionResult, MeterReading, RowRejection};
pub use decoder::{FieldMap, RecordDecoder};
pub use candidate::{map_candidate, CandidateRecord};
pub use rules::{
    AcceptedCandidate, BatchLedger, OrderingScope, RuleEvaluator, Verdict,
    READING_TIMESTAMP_FORMAT,
};
pub use factory::build_reading;
pub use ingest::{
    commit_batch, ingest_csv, ingest_file, ingest_upload, BatchReport, IngestOptions,
};
pub use store::ReadingStore;
pub use db::{setup_database, SqliteStore, StoreStatus};
pub use seed::{load_accounts_csv, seed_accounts};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
