use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::models::{Account, MeterReading, STORED_TIMESTAMP_FORMAT};
use crate::store::ReadingStore;

/// Connection and row counts, as reported by `/api/db-status`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStatus {
    pub can_connect: bool,
    pub account_count: i64,
    pub reading_count: i64,
}

pub fn setup_database(conn: &Connection) -> Result<(), StoreError> {
    // Enable WAL mode for crash recovery (in-memory databases report "memory")
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    debug!("journal_mode = {}", mode);

    // Readings are owned by accounts; deletes must cascade
    conn.pragma_update(None, "foreign_keys", true)?;

    // ==========================================================================
    // Accounts Table (ids are caller-assigned, never generated)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS accounts (
            account_id INTEGER PRIMARY KEY NOT NULL,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Meter Readings Table
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS meter_readings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            account_id INTEGER NOT NULL
                REFERENCES accounts(account_id) ON DELETE CASCADE,
            reading_date_time TEXT NOT NULL,
            meter_read_value INTEGER NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (account_id, reading_date_time)
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_readings_account_time
            ON meter_readings(account_id, reading_date_time)",
        [],
    )?;

    Ok(())
}

fn parse_stored_timestamp(value: String) -> Result<NaiveDateTime, StoreError> {
    NaiveDateTime::parse_from_str(&value, STORED_TIMESTAMP_FORMAT)
        .map_err(|_| StoreError::CorruptTimestamp { value })
}

fn format_stored_timestamp(at: NaiveDateTime) -> String {
    at.format(STORED_TIMESTAMP_FORMAT).to_string()
}

// ============================================================================
// SQLITE STORE
// ============================================================================

/// SQLite-backed account/reading store
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) a database file and make sure the schema exists
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        info!("Opened database at {}", path.display());
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        setup_database(&conn)?;
        Ok(SqliteStore { conn })
    }

    /// Insert accounts, skipping ids that already exist. Returns how many
    /// were actually added.
    pub fn insert_accounts(&mut self, accounts: &[Account]) -> Result<usize, StoreError> {
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO accounts (account_id, first_name, last_name)
                 VALUES (?1, ?2, ?3)",
            )?;
            for account in accounts {
                inserted += stmt.execute(params![
                    account.account_id,
                    account.first_name,
                    account.last_name
                ])?;
            }
        }
        tx.commit()?;

        debug!(
            "Inserted {} accounts ({} already present)",
            inserted,
            accounts.len() - inserted
        );
        Ok(inserted)
    }

    /// Delete an account together with all of its readings
    pub fn delete_account(&mut self, account_id: i64) -> Result<bool, StoreError> {
        let deleted = self
            .conn
            .execute("DELETE FROM accounts WHERE account_id = ?1", [account_id])?;
        Ok(deleted > 0)
    }

    pub fn account_count(&self) -> Result<i64, StoreError> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM accounts", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn reading_count(&self) -> Result<i64, StoreError> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM meter_readings", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Readings for one account, oldest first
    pub fn readings_for_account(&self, account_id: i64) -> Result<Vec<MeterReading>, StoreError> {
        self.query_readings(
            "SELECT id, account_id, reading_date_time, meter_read_value
             FROM meter_readings
             WHERE account_id = ?1
             ORDER BY reading_date_time ASC",
            Some(account_id),
        )
    }

    /// Every stored reading, ordered by account then time
    pub fn all_readings(&self) -> Result<Vec<MeterReading>, StoreError> {
        self.query_readings(
            "SELECT id, account_id, reading_date_time, meter_read_value
             FROM meter_readings
             ORDER BY account_id ASC, reading_date_time ASC",
            None,
        )
    }

    fn query_readings(
        &self,
        sql: &str,
        account_id: Option<i64>,
    ) -> Result<Vec<MeterReading>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<(i64, i64, String, u32)> {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, u32>(3)?,
            ))
        };

        let rows = match account_id {
            Some(id) => stmt
                .query_map([id], map_row)?
                .collect::<Result<Vec<_>, _>>()?,
            None => stmt.query_map([], map_row)?.collect::<Result<Vec<_>, _>>()?,
        };

        rows.into_iter()
            .map(|(id, account_id, at, value)| -> Result<MeterReading, StoreError> {
                Ok(MeterReading {
                    id: Some(id),
                    account_id,
                    reading_date_time: parse_stored_timestamp(at)?,
                    meter_read_value: value,
                })
            })
            .collect()
    }

    /// Connection check plus row counts; never fails
    ///
    /// `can_connect` is only true when both tables could be counted.
    pub fn status(&self) -> StoreStatus {
        match (self.account_count(), self.reading_count()) {
            (Ok(account_count), Ok(reading_count)) => StoreStatus {
                can_connect: true,
                account_count,
                reading_count,
            },
            (accounts, readings) => {
                if let Err(e) = accounts.and(readings) {
                    warn!("Store status check failed: {}", e);
                }
                StoreStatus {
                    can_connect: false,
                    account_count: 0,
                    reading_count: 0,
                }
            }
        }
    }
}

impl ReadingStore for SqliteStore {
    fn account_exists(&self, account_id: i64) -> Result<bool, StoreError> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM accounts WHERE account_id = ?1",
                [account_id],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn latest_reading_timestamp(
        &self,
        account_id: i64,
    ) -> Result<Option<NaiveDateTime>, StoreError> {
        let latest: Option<String> = self.conn.query_row(
            "SELECT MAX(reading_date_time) FROM meter_readings WHERE account_id = ?1",
            [account_id],
            |row| row.get(0),
        )?;

        latest.map(parse_stored_timestamp).transpose()
    }

    fn reading_exists(&self, account_id: i64, at: NaiveDateTime) -> Result<bool, StoreError> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM meter_readings
                 WHERE account_id = ?1 AND reading_date_time = ?2",
                params![account_id, format_stored_timestamp(at)],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn bulk_insert_readings(&mut self, readings: &[MeterReading]) -> Result<usize, StoreError> {
        // Dropping the transaction on error rolls back every insert
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO meter_readings (account_id, reading_date_time, meter_read_value)
                 VALUES (?1, ?2, ?3)",
            )?;
            for reading in readings {
                stmt.execute(params![
                    reading.account_id,
                    reading.stored_timestamp(),
                    reading.meter_read_value
                ])?;
            }
        }
        tx.commit()?;

        Ok(readings.len())
    }

    fn all_accounts(&self) -> Result<Vec<Account>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT account_id, first_name, last_name FROM accounts ORDER BY account_id",
        )?;

        let accounts = stmt
            .query_map([], |row| {
                Ok(Account {
                    account_id: row.get(0)?,
                    first_name: row.get(1)?,
                    last_name: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(accounts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 4, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    /// Helper: store with accounts 1 and 2
    fn seeded_store() -> SqliteStore {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store
            .insert_accounts(&[
                Account::new(1, "Clem", "Evans"),
                Account::new(2, "Jane", "Smith"),
            ])
            .unwrap();
        store
    }

    #[test]
    fn test_account_exists() {
        let store = seeded_store();

        assert!(store.account_exists(1).unwrap());
        assert!(!store.account_exists(999).unwrap());
    }

    #[test]
    fn test_insert_accounts_skips_existing() {
        let mut store = seeded_store();

        let inserted = store
            .insert_accounts(&[
                Account::new(2, "Someone", "Else"),
                Account::new(3, "Dylan", "Johnson"),
            ])
            .unwrap();

        assert_eq!(inserted, 1);
        let accounts = store.all_accounts().unwrap();
        assert_eq!(accounts.len(), 3);
        assert_eq!(accounts[1].first_name, "Jane");
    }

    #[test]
    fn test_latest_and_exists() {
        let mut store = seeded_store();
        assert_eq!(store.latest_reading_timestamp(1).unwrap(), None);

        store
            .bulk_insert_readings(&[
                MeterReading::new(1, at(22, 12, 25), 12345),
                MeterReading::new(1, at(23, 15, 30), 12400),
            ])
            .unwrap();

        assert_eq!(
            store.latest_reading_timestamp(1).unwrap(),
            Some(at(23, 15, 30))
        );
        assert!(store.reading_exists(1, at(22, 12, 25)).unwrap());
        assert!(!store.reading_exists(2, at(22, 12, 25)).unwrap());
        assert_eq!(store.latest_reading_timestamp(2).unwrap(), None);
    }

    #[test]
    fn test_bulk_insert_is_all_or_nothing() {
        let mut store = seeded_store();
        store
            .bulk_insert_readings(&[MeterReading::new(1, at(22, 12, 25), 12345)])
            .unwrap();

        // Second element violates UNIQUE(account_id, reading_date_time)
        let result = store.bulk_insert_readings(&[
            MeterReading::new(2, at(22, 12, 25), 54321),
            MeterReading::new(1, at(22, 12, 25), 11111),
        ]);

        assert!(result.is_err());
        assert_eq!(store.reading_count().unwrap(), 1);
        assert!(store.readings_for_account(2).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_account_rejected_by_foreign_key() {
        let mut store = seeded_store();

        let result = store.bulk_insert_readings(&[MeterReading::new(999, at(22, 12, 25), 1)]);
        assert!(result.is_err());
    }

    #[test]
    fn test_delete_account_cascades() {
        let mut store = seeded_store();
        store
            .bulk_insert_readings(&[
                MeterReading::new(1, at(22, 12, 25), 12345),
                MeterReading::new(2, at(22, 12, 25), 54321),
            ])
            .unwrap();

        assert!(store.delete_account(1).unwrap());
        assert!(!store.delete_account(1).unwrap());

        let remaining = store.all_readings().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].account_id, 2);
        assert!(remaining[0].id.is_some());
    }

    #[test]
    fn test_status_counts() {
        let mut store = seeded_store();
        store
            .bulk_insert_readings(&[MeterReading::new(1, at(22, 12, 25), 12345)])
            .unwrap();

        let status = store.status();
        assert!(status.can_connect);
        assert_eq!(status.account_count, 2);
        assert_eq!(status.reading_count, 1);
    }

    #[test]
    fn test_status_reports_failed_counts() {
        let store = seeded_store();
        store.conn.execute("DROP TABLE meter_readings", []).unwrap();

        let status = store.status();
        assert!(!status.can_connect);
        assert_eq!(status.account_count, 0);
        assert_eq!(status.reading_count, 0);
    }

    #[test]
    fn test_open_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("readings.db");

        {
            let mut store = SqliteStore::open(&path).unwrap();
            store.insert_accounts(&[Account::new(1, "Clem", "Evans")]).unwrap();
        }

        let reopened = SqliteStore::open(&path).unwrap();
        assert!(reopened.account_exists(1).unwrap());
    }
}
