// 📦 Domain Models - Accounts, readings and batch results

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::RejectionKind;

/// Storage format for reading timestamps (sorts lexicographically)
pub const STORED_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ============================================================================
// ACCOUNT
// ============================================================================

/// Account - identity is caller-assigned and never changes
///
/// Created by seeding only. The ingestion pipeline reads accounts but never
/// writes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    #[serde(rename = "AccountId")]
    pub account_id: i64,

    #[serde(rename = "FirstName")]
    pub first_name: String,

    #[serde(rename = "LastName")]
    pub last_name: String,
}

impl Account {
    pub fn new(account_id: i64, first_name: &str, last_name: &str) -> Self {
        Account {
            account_id,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
        }
    }
}

// ============================================================================
// METER READING
// ============================================================================

/// A durably accepted reading
///
/// `id` is `None` until the store assigns one. `(account_id,
/// reading_date_time)` is unique across the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeterReading {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub account_id: i64,
    pub reading_date_time: NaiveDateTime,
    pub meter_read_value: u32,
}

impl MeterReading {
    pub fn new(account_id: i64, reading_date_time: NaiveDateTime, meter_read_value: u32) -> Self {
        MeterReading {
            id: None,
            account_id,
            reading_date_time,
            meter_read_value,
        }
    }

    pub fn stored_timestamp(&self) -> String {
        self.reading_date_time
            .format(STORED_TIMESTAMP_FORMAT)
            .to_string()
    }
}

// ============================================================================
// BATCH RESULT
// ============================================================================

/// Aggregate outcome returned to callers once per batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionResult {
    pub accepted_count: usize,
    pub rejected_count: usize,
}

impl IngestionResult {
    pub fn total(&self) -> usize {
        self.accepted_count + self.rejected_count
    }
}

/// Which row failed and why (1-based data row, header excluded)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRejection {
    pub row: usize,
    pub kind: RejectionKind,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_stored_timestamp_format() {
        let at = NaiveDate::from_ymd_opt(2023, 4, 22)
            .unwrap()
            .and_hms_opt(12, 25, 0)
            .unwrap();
        let reading = MeterReading::new(1, at, 12345);

        assert_eq!(reading.stored_timestamp(), "2023-04-22 12:25:00");
        assert!(reading.id.is_none());
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let result = IngestionResult {
            accepted_count: 2,
            rejected_count: 4,
        };

        let json = serde_json::to_value(result).unwrap();
        assert_eq!(json["acceptedCount"], 2);
        assert_eq!(json["rejectedCount"], 4);
        assert_eq!(result.total(), 6);
    }

    #[test]
    fn test_account_deserializes_seed_headers() {
        let mut rdr = csv::Reader::from_reader("AccountId,FirstName,LastName\n2344,Tommy,Test\n".as_bytes());
        let accounts: Vec<Account> = rdr.deserialize().collect::<Result<_, _>>().unwrap();

        assert_eq!(accounts, vec![Account::new(2344, "Tommy", "Test")]);
    }
}
