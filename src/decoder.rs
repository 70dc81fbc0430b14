// 📥 Record Decoder - CSV bytes → header/value field maps
//
// Rows may have more or fewer columns than the header. Missing columns are
// simply absent from the map, extra columns are dropped.

use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::HashMap;
use std::io::Read;

/// One decoded row keyed by normalised (lower-case) header name
pub type FieldMap = HashMap<String, String>;

/// Normalise a header cell so lookups are case-insensitive
pub fn normalize_header(header: &str) -> String {
    header
        .trim_start_matches('\u{feff}')
        .trim()
        .to_ascii_lowercase()
}

/// Lazy sequence of field maps over a CSV stream
pub struct RecordDecoder<R: Read> {
    reader: csv::Reader<R>,
    headers: Vec<String>,
    record: StringRecord,
}

impl<R: Read> RecordDecoder<R> {
    /// Read the header row and prepare to stream data rows
    pub fn new(input: R) -> Result<Self, csv::Error> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(input);

        let headers = reader.headers()?.iter().map(normalize_header).collect();

        Ok(RecordDecoder {
            reader,
            headers,
            record: StringRecord::new(),
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    fn current_fields(&self) -> FieldMap {
        self.headers
            .iter()
            .zip(self.record.iter())
            .filter(|(name, _)| !name.is_empty())
            .map(|(name, value)| (name.clone(), value.to_string()))
            .collect()
    }
}

impl<R: Read> Iterator for RecordDecoder<R> {
    type Item = Result<FieldMap, csv::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read_record(&mut self.record) {
            Ok(true) => Some(Ok(self.current_fields())),
            Ok(false) => None,
            Err(e) => Some(Err(e)),
        }
    }
}
