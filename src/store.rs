// 🗄️ Account/Reading Store - the seam between the pipeline and persistence
//
// Lookups take `&self` and must be safe to call repeatedly. The only write the
// pipeline ever performs is `bulk_insert_readings`, once per batch.

use chrono::NaiveDateTime;

use crate::error::StoreError;
use crate::models::{Account, MeterReading};

pub trait ReadingStore {
    /// Does an account with this id exist?
    fn account_exists(&self, account_id: i64) -> Result<bool, StoreError>;

    /// Latest stored reading timestamp for the account, if any
    fn latest_reading_timestamp(&self, account_id: i64)
        -> Result<Option<NaiveDateTime>, StoreError>;

    /// Is there already a reading at exactly this timestamp?
    fn reading_exists(&self, account_id: i64, at: NaiveDateTime) -> Result<bool, StoreError>;

    /// Persist all readings atomically; either all are stored or none are
    fn bulk_insert_readings(&mut self, readings: &[MeterReading]) -> Result<usize, StoreError>;

    /// Every known account (used by seeding and status reporting)
    fn all_accounts(&self) -> Result<Vec<Account>, StoreError>;
}
