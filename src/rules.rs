// 🚦 Validation Rules - accept or reject one candidate against stored state
//
// Rules run in a fixed order and stop at the first failure:
//   1. account reference   → UnknownAccount
//   2. value format        → MalformedValue
//   3. timestamp format    → MalformedTimestamp
//   4. duplicate reading   → DuplicateReading
//   5. reading order       → OutOfOrderReading
//
// Rules 1, 4 and 5 each cost one store round trip. Nothing is cached between
// candidates; every lookup sees current stored state.

use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::candidate::CandidateRecord;
use crate::error::{RejectionKind, StoreError};
use crate::store::ReadingStore;

/// Only accepted timestamp layout: `22/04/2023 12:25`
pub const READING_TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Exact number of digits in a meter read value
pub const METER_VALUE_DIGITS: usize = 5;

// ============================================================================
// STRUCTURAL CHECKS (pure)
// ============================================================================

/// Positive integer made only of ASCII digits
pub fn parse_account_id(text: &str) -> Option<i64> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse::<i64>().ok().filter(|id| *id > 0)
}

/// Exactly five ASCII decimal digits ("00000" included)
pub fn is_valid_meter_value(text: &str) -> bool {
    text.len() == METER_VALUE_DIGITS && text.bytes().all(|b| b.is_ascii_digit())
}

/// Parse `dd/mm/yyyy HH:MM` strictly
///
/// chrono alone would accept unpadded fields and signed years, so the layout
/// is checked byte by byte first. Calendar years start at 0001.
pub fn parse_reading_timestamp(text: &str) -> Option<NaiveDateTime> {
    let bytes = text.as_bytes();
    if bytes.len() != 16 {
        return None;
    }

    let layout_ok = bytes.iter().enumerate().all(|(i, b)| match i {
        2 | 5 => *b == b'/',
        10 => *b == b' ',
        13 => *b == b':',
        _ => b.is_ascii_digit(),
    });
    if !layout_ok {
        return None;
    }

    NaiveDateTime::parse_from_str(text, READING_TIMESTAMP_FORMAT)
        .ok()
        .filter(|at| at.year() >= 1)
}

// ============================================================================
// ORDERING SCOPE
// ============================================================================

/// What the duplicate and ordering rules compare a candidate against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrderingScope {
    /// Durably stored readings only; siblings in the same batch are invisible
    #[default]
    StoredOnly,

    /// Stored readings plus readings accepted earlier in the same batch
    IncludeBatch,
}

/// Readings accepted so far in the current batch
///
/// Only consulted under `OrderingScope::IncludeBatch`. This is batch state,
/// not a cache of store answers.
#[derive(Debug, Default)]
pub struct BatchLedger {
    latest: HashMap<i64, NaiveDateTime>,
    seen: HashSet<(i64, NaiveDateTime)>,
}

impl BatchLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, accepted: &AcceptedCandidate) {
        let at = accepted.reading_date_time;
        self.seen.insert((accepted.account_id, at));
        self.latest
            .entry(accepted.account_id)
            .and_modify(|latest| {
                if at > *latest {
                    *latest = at;
                }
            })
            .or_insert(at);
    }

    pub fn contains(&self, account_id: i64, at: NaiveDateTime) -> bool {
        self.seen.contains(&(account_id, at))
    }

    pub fn latest(&self, account_id: i64) -> Option<NaiveDateTime> {
        self.latest.get(&account_id).copied()
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

// ============================================================================
// VERDICT
// ============================================================================

/// A candidate that passed every rule, with its fields already parsed
///
/// Only `RuleEvaluator` builds these, so the value text is always five
/// ASCII digits:
///
/// ```compile_fail
/// let forged = meter_readings::AcceptedCandidate {
///     row: 1,
///     account_id: 1,
///     reading_date_time: chrono::NaiveDateTime::default(),
///     meter_read_value: "abcde".to_string(),
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedCandidate {
    pub(crate) row: usize,
    pub(crate) account_id: i64,
    pub(crate) reading_date_time: NaiveDateTime,
    /// Five-digit text, validated by rule 2
    pub(crate) meter_read_value: String,
}

impl AcceptedCandidate {
    pub fn row(&self) -> usize {
        self.row
    }

    pub fn account_id(&self) -> i64 {
        self.account_id
    }

    pub fn reading_date_time(&self) -> NaiveDateTime {
        self.reading_date_time
    }

    pub fn meter_read_value(&self) -> &str {
        &self.meter_read_value
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted(AcceptedCandidate),
    Rejected(RejectionKind),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted(_))
    }

    pub fn rejection(&self) -> Option<RejectionKind> {
        match self {
            Verdict::Accepted(_) => None,
            Verdict::Rejected(kind) => Some(*kind),
        }
    }
}

// ============================================================================
// RULE EVALUATOR
// ============================================================================

pub struct RuleEvaluator<'a, S: ReadingStore + ?Sized> {
    store: &'a S,
    scope: OrderingScope,
}

impl<'a, S: ReadingStore + ?Sized> RuleEvaluator<'a, S> {
    pub fn new(store: &'a S, scope: OrderingScope) -> Self {
        RuleEvaluator { store, scope }
    }

    /// Decide one candidate. `Err` means the store itself failed, which is a
    /// batch-level problem rather than a rejection.
    pub fn evaluate(
        &self,
        candidate: &CandidateRecord,
        ledger: &BatchLedger,
    ) -> Result<Verdict, StoreError> {
        // Rule 1: account reference
        let account_id = match parse_account_id(&candidate.account_id) {
            Some(id) => id,
            None => return Ok(Verdict::Rejected(RejectionKind::UnknownAccount)),
        };
        if !self.store.account_exists(account_id)? {
            return Ok(Verdict::Rejected(RejectionKind::UnknownAccount));
        }

        // Rule 2: value format
        if !is_valid_meter_value(&candidate.meter_read_value) {
            return Ok(Verdict::Rejected(RejectionKind::MalformedValue));
        }

        // Rule 3: timestamp format
        let at = match parse_reading_timestamp(&candidate.reading_date_time) {
            Some(at) => at,
            None => return Ok(Verdict::Rejected(RejectionKind::MalformedTimestamp)),
        };

        let include_batch = self.scope == OrderingScope::IncludeBatch;

        // Rule 4: duplicate
        if self.store.reading_exists(account_id, at)?
            || (include_batch && ledger.contains(account_id, at))
        {
            return Ok(Verdict::Rejected(RejectionKind::DuplicateReading));
        }

        // Rule 5: ordering (equal timestamps were already caught by rule 4)
        if let Some(latest) = self.store.latest_reading_timestamp(account_id)? {
            if at < latest {
                return Ok(Verdict::Rejected(RejectionKind::OutOfOrderReading));
            }
        }
        if include_batch {
            if let Some(latest) = ledger.latest(account_id) {
                if at < latest {
                    return Ok(Verdict::Rejected(RejectionKind::OutOfOrderReading));
                }
            }
        }

        Ok(Verdict::Accepted(AcceptedCandidate {
            row: candidate.row,
            account_id,
            reading_date_time: at,
            meter_read_value: candidate.meter_read_value.clone(),
        }))
    }
}

// ============================================================================
// TESTS
// ============================================================================
