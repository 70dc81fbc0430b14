// 🌱 Account Seeding - reference data from a CSV file
//
// Expected header: AccountId,FirstName,LastName

use anyhow::{bail, Context, Result};
use std::path::Path;
use tracing::info;

use crate::db::SqliteStore;
use crate::models::Account;
use crate::store::ReadingStore;

/// Load accounts from a CSV file
pub fn load_accounts_csv(csv_path: &Path) -> Result<Vec<Account>> {
    if !csv_path.exists() {
        bail!("Accounts CSV file not found: {}", csv_path.display());
    }

    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(csv_path)
        .context("Failed to open accounts CSV file")?;

    let mut accounts = Vec::new();
    for (index, result) in rdr.deserialize().enumerate() {
        let account: Account = result
            .with_context(|| format!("Failed to deserialize account on row {}", index + 1))?;
        accounts.push(account);
    }

    Ok(accounts)
}

/// Seed accounts only if the store has none yet. Returns how many were added.
pub fn seed_accounts(store: &mut SqliteStore, csv_path: &Path) -> Result<usize> {
    let existing = store
        .all_accounts()
        .context("Failed to list existing accounts")?;
    if !existing.is_empty() {
        info!(
            "Skipping seed: store already holds {} accounts",
            existing.len()
        );
        return Ok(0);
    }

    let accounts = load_accounts_csv(csv_path)?;
    let inserted = store
        .insert_accounts(&accounts)
        .context("Failed to insert seed accounts")?;

    info!(
        "Seeded {} accounts from {}",
        inserted,
        csv_path.display()
    );
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_accounts(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
        let path = dir.path().join("Test_Accounts.csv");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_load_accounts_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_accounts(
            &dir,
            "AccountId,FirstName,LastName\n2344,Tommy,Test\n2233, Barry ,Test\n",
        );

        let accounts = load_accounts_csv(&path).unwrap();

        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0], Account::new(2344, "Tommy", "Test"));
        assert_eq!(accounts[1].first_name, "Barry");
    }

    #[test]
    fn test_seed_twice_does_not_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_accounts(
            &dir,
            "AccountId,FirstName,LastName\n1,Clem,Evans\n2,Jane,Smith\n3,Dylan,Johnson\n",
        );
        let mut store = SqliteStore::open_in_memory().unwrap();

        assert_eq!(seed_accounts(&mut store, &path).unwrap(), 3);
        assert_eq!(seed_accounts(&mut store, &path).unwrap(), 0);
        assert_eq!(store.account_count().unwrap(), 3);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SqliteStore::open_in_memory().unwrap();

        let err = seed_accounts(&mut store, &dir.path().join("missing.csv")).unwrap_err();
        assert!(err.to_string().contains("Accounts CSV file not found"));
    }

    #[test]
    fn test_missing_file_ignored_once_seeded() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SqliteStore::open_in_memory().unwrap();
        store
            .insert_accounts(&[Account::new(1, "Clem", "Evans")])
            .unwrap();

        let inserted = seed_accounts(&mut store, &dir.path().join("missing.csv")).unwrap();
        assert_eq!(inserted, 0);
        assert_eq!(store.account_count().unwrap(), 1);
    }

    #[test]
    fn test_bad_row_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_accounts(&dir, "AccountId,FirstName,LastName\nabc,Tommy,Test\n");

        assert!(load_accounts_csv(&path).is_err());
    }
}
