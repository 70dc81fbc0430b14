// Test helpers: a store wrapper that counts calls and can be told to fail

use chrono::{NaiveDate, NaiveDateTime};
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::db::SqliteStore;
use crate::error::StoreError;
use crate::models::{Account, MeterReading};
use crate::store::ReadingStore;

pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

/// In-memory SQLite store that records how often it is touched
pub struct RecordingStore {
    pub inner: SqliteStore,
    lookups: Cell<usize>,
    bulk_inserts: usize,
    fail_lookups: bool,
    fail_commit: bool,
    cancel_on_lookup: Option<Arc<AtomicBool>>,
}

impl RecordingStore {
    pub fn with_accounts(ids: &[i64]) -> Self {
        let mut inner = SqliteStore::open_in_memory().unwrap();
        let accounts: Vec<Account> = ids
            .iter()
            .map(|id| Account::new(*id, "Test", &format!("Account{}", id)))
            .collect();
        inner.insert_accounts(&accounts).unwrap();

        RecordingStore {
            inner,
            lookups: Cell::new(0),
            bulk_inserts: 0,
            fail_lookups: false,
            fail_commit: false,
            cancel_on_lookup: None,
        }
    }

    pub fn failing_lookups(mut self) -> Self {
        self.fail_lookups = true;
        self
    }

    pub fn failing_commit(mut self) -> Self {
        self.fail_commit = true;
        self
    }

    /// Raise `flag` on every lookup, as if the caller cancelled mid-row
    pub fn cancelling_on_lookup(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel_on_lookup = Some(flag);
        self
    }

    /// Store readings directly, bypassing the counters
    pub fn preload(&mut self, readings: &[MeterReading]) {
        self.inner.bulk_insert_readings(readings).unwrap();
    }

    pub fn lookups(&self) -> usize {
        self.lookups.get()
    }

    pub fn bulk_inserts(&self) -> usize {
        self.bulk_inserts
    }

    fn touch(&self) -> Result<(), StoreError> {
        self.lookups.set(self.lookups.get() + 1);
        if let Some(flag) = &self.cancel_on_lookup {
            flag.store(true, Ordering::SeqCst);
        }
        if self.fail_lookups {
            return Err(StoreError::Unavailable("lookup refused".to_string()));
        }
        Ok(())
    }
}

impl ReadingStore for RecordingStore {
    fn account_exists(&self, account_id: i64) -> Result<bool, StoreError> {
        self.touch()?;
        self.inner.account_exists(account_id)
    }

    fn latest_reading_timestamp(
        &self,
        account_id: i64,
    ) -> Result<Option<NaiveDateTime>, StoreError> {
        self.touch()?;
        self.inner.latest_reading_timestamp(account_id)
    }

    fn reading_exists(&self, account_id: i64, at: NaiveDateTime) -> Result<bool, StoreError> {
        self.touch()?;
        self.inner.reading_exists(account_id, at)
    }

    fn bulk_insert_readings(&mut self, readings: &[MeterReading]) -> Result<usize, StoreError> {
        self.bulk_inserts += 1;
        if self.fail_commit {
            return Err(StoreError::Unavailable("commit refused".to_string()));
        }
        self.inner.bulk_insert_readings(readings)
    }

    fn all_accounts(&self) -> Result<Vec<Account>, StoreError> {
        self.touch()?;
        self.inner.all_accounts()
    }
}
