// 🧾 Candidate Mapper - field map → untyped candidate record
//
// Never fails. Structural problems are left for the rule evaluator so a bad
// row is counted as rejected instead of aborting the batch.

use crate::decoder::FieldMap;

/// Accepted header spellings for each logical column (already lower-case)
const ACCOUNT_ID_HEADERS: &[&str] = &["accountid", "account_id"];
const READING_DATE_TIME_HEADERS: &[&str] = &[
    "meterreadingdatetime",
    "readingdatetime",
    "reading_date_time",
];
const METER_READ_VALUE_HEADERS: &[&str] = &["meterreadvalue", "meter_read_value"];

/// One input row before validation
///
/// Keeps the original text of every field so rejections can be reported
/// against what the caller actually sent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CandidateRecord {
    /// 1-based data row number (header excluded)
    pub row: usize,
    pub account_id: String,
    pub reading_date_time: String,
    pub meter_read_value: String,
}

impl CandidateRecord {
    pub fn new(row: usize, account_id: &str, reading_date_time: &str, meter_read_value: &str) -> Self {
        CandidateRecord {
            row,
            account_id: account_id.to_string(),
            reading_date_time: reading_date_time.to_string(),
            meter_read_value: meter_read_value.to_string(),
        }
    }
}

fn first_field(fields: &FieldMap, names: &[&str]) -> String {
    names
        .iter()
        .find_map(|name| fields.get(*name))
        .cloned()
        .unwrap_or_default()
}

/// Map one decoded row to a candidate; absent columns become empty text
pub fn map_candidate(row: usize, fields: &FieldMap) -> CandidateRecord {
    CandidateRecord {
        row,
        account_id: first_field(fields, ACCOUNT_ID_HEADERS),
        reading_date_time: first_field(fields, READING_DATE_TIME_HEADERS),
        meter_read_value: first_field(fields, METER_READ_VALUE_HEADERS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> FieldMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_map_canonical_headers() {
        let map = fields(&[
            ("accountid", "1"),
            ("meterreadingdatetime", "22/04/2023 12:25"),
            ("meterreadvalue", "12345"),
        ]);

        let candidate = map_candidate(1, &map);
        assert_eq!(candidate, CandidateRecord::new(1, "1", "22/04/2023 12:25", "12345"));
    }

    #[test]
    fn test_map_logical_headers() {
        let map = fields(&[
            ("accountid", "2"),
            ("readingdatetime", "01/01/2023 10:00"),
            ("meterreadvalue", "54321"),
        ]);

        let candidate = map_candidate(3, &map);
        assert_eq!(candidate.row, 3);
        assert_eq!(candidate.reading_date_time, "01/01/2023 10:00");
    }

    #[test]
    fn test_missing_fields_become_empty() {
        let candidate = map_candidate(1, &fields(&[("accountid", "9")]));

        assert_eq!(candidate.account_id, "9");
        assert!(candidate.reading_date_time.is_empty());
        assert!(candidate.meter_read_value.is_empty());
    }
}
