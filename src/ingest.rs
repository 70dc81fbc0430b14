// 📤 Ingestion Pipeline - decode → map → validate → build → commit
//
// A batch is validated in full before anything is written. The commit is a
// single store transaction, so callers either see every accepted reading of
// a batch or none of them.

use serde::Serialize;
use std::fs;
use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use crate::candidate::map_candidate;
use crate::decoder::RecordDecoder;
use crate::error::{IngestError, IngestResult};
use crate::factory::build_reading;
use crate::models::{IngestionResult, MeterReading, RowRejection};
use crate::rules::{BatchLedger, OrderingScope, RuleEvaluator, Verdict};
use crate::store::ReadingStore;

// ============================================================================
// OPTIONS
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    pub ordering: OrderingScope,

    /// Checked before each row and before the commit; ignored once the
    /// bulk write has started
    pub cancel: Option<Arc<AtomicBool>>,
}

impl IngestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ordering(mut self, ordering: OrderingScope) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|flag| flag.load(Ordering::SeqCst))
            .unwrap_or(false)
    }
}

// ============================================================================
// BATCH REPORT
// ============================================================================

/// Everything known about one finished batch
///
/// `result` is the public contract. `rejections` lists which rows failed
/// and why, for logs and the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub result: IngestionResult,
    pub rejections: Vec<RowRejection>,
}

impl BatchReport {
    pub fn accepted(&self) -> usize {
        self.result.accepted_count
    }

    pub fn rejected(&self) -> usize {
        self.result.rejected_count
    }
}

// ============================================================================
// BATCH COMMITTER
// ============================================================================

/// Persist the accepted readings of one batch in a single bulk write
///
/// An empty set never touches the store.
pub fn commit_batch<S: ReadingStore + ?Sized>(
    store: &mut S,
    readings: &[MeterReading],
    rejected: usize,
) -> IngestResult<IngestionResult> {
    let accepted = if readings.is_empty() {
        0
    } else {
        store
            .bulk_insert_readings(readings)
            .map_err(IngestError::Commit)?
    };

    Ok(IngestionResult {
        accepted_count: accepted,
        rejected_count: rejected,
    })
}

// ============================================================================
// PIPELINE
// ============================================================================

/// Run one batch over a CSV stream
pub fn ingest_csv<R: Read, S: ReadingStore + ?Sized>(
    store: &mut S,
    input: R,
    options: &IngestOptions,
) -> IngestResult<BatchReport> {
    let batch_id = Uuid::new_v4();
    let span = info_span!("batch", %batch_id);
    let _enter = span.enter();

    let decoder = RecordDecoder::new(input)?;
    if decoder.headers().is_empty() {
        return Err(IngestError::InvalidInput(
            "input has no header row".to_string(),
        ));
    }
    debug!("Headers: {:?}", decoder.headers());

    let evaluator = RuleEvaluator::new(&*store, options.ordering);
    let mut ledger = BatchLedger::new();
    let mut readings = Vec::new();
    let mut rejections = Vec::new();

    for (index, fields) in decoder.enumerate() {
        if options.is_cancelled() {
            warn!("Cancelled after {} rows, nothing written", index);
            return Err(IngestError::Cancelled);
        }

        let candidate = map_candidate(index + 1, &fields?);

        match evaluator
            .evaluate(&candidate, &ledger)
            .map_err(IngestError::Lookup)?
        {
            Verdict::Accepted(accepted) => {
                ledger.record(&accepted);
                readings.push(build_reading(&accepted));
            }
            Verdict::Rejected(kind) => {
                debug!(
                    "Row {} rejected ({}): account={:?} time={:?} value={:?}",
                    candidate.row,
                    kind,
                    candidate.account_id,
                    candidate.reading_date_time,
                    candidate.meter_read_value
                );
                rejections.push(RowRejection {
                    row: candidate.row,
                    kind,
                });
            }
        }
    }

    if options.is_cancelled() {
        warn!("Cancelled before commit, nothing written");
        return Err(IngestError::Cancelled);
    }

    let result = commit_batch(store, &readings, rejections.len())?;
    info!(
        "Batch complete: {} accepted, {} rejected",
        result.accepted_count, result.rejected_count
    );

    Ok(BatchReport {
        batch_id,
        result,
        rejections,
    })
}

/// Check the caller's upload before running the batch
///
/// Empty payloads and non-CSV file names are rejected without touching the
/// store.
pub fn ingest_upload<S: ReadingStore + ?Sized>(
    store: &mut S,
    file_name: &str,
    bytes: &[u8],
    options: &IngestOptions,
) -> IngestResult<BatchReport> {
    if bytes.is_empty() {
        return Err(IngestError::InvalidInput(
            "No file provided or file is empty".to_string(),
        ));
    }
    if !has_csv_extension(file_name) {
        return Err(IngestError::InvalidInput(
            "Only CSV files are supported".to_string(),
        ));
    }

    info!("Ingesting upload {} ({} bytes)", file_name, bytes.len());
    ingest_csv(store, bytes, options)
}

/// Read a CSV file from disk and ingest it
pub fn ingest_file<S: ReadingStore + ?Sized>(
    store: &mut S,
    path: &Path,
    options: &IngestOptions,
) -> IngestResult<BatchReport> {
    let bytes = fs::read(path).map_err(|e| {
        IngestError::InvalidInput(format!("cannot read {}: {}", path.display(), e))
    })?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    ingest_upload(store, &file_name, &bytes, options)
}

fn has_csv_extension(file_name: &str) -> bool {
    file_name.to_ascii_lowercase().ends_with(".csv")
}

// ============================================================================
// TESTS
// ============================================================================
