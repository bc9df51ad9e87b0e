//! Flat text file ledger storage
//!
//! One account per line, three whitespace-separated fields:
//!
//! ```text
//! 1001 9999 100.0
//! 1002 1234 2500.5
//! ```
//!
//! Writes go to a temp file in the ledger's directory which is then renamed
//! over the ledger, under an exclusive lock on a `.lock` sidecar file, so a
//! reader never sees a half-written ledger.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tempfile::NamedTempFile;

use crate::domain::result::{Error, Result};
use crate::domain::{format_amount, parse_amount, Account};
use crate::ports::LedgerStorage;

/// Ledger stored as a whitespace-separated text file
pub struct FlatFileStorage {
    path: PathBuf,
}

impl FlatFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        self.path.with_file_name(name)
    }

    fn parent_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Open and exclusively lock the sidecar lock file
    ///
    /// The lock is released when the returned handle is dropped.
    fn acquire_lock(&self) -> Result<File> {
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.lock_path())?;
        lock_file
            .lock_exclusive()
            .map_err(|e| Error::storage(format!("Failed to lock {}: {}", self.describe(), e)))?;
        Ok(lock_file)
    }
}

/// Parse ledger text into account records
pub fn parse_ledger(content: &str) -> Result<Vec<Account>> {
    let mut accounts = Vec::new();
    let mut seen = HashSet::new();

    for (index, line) in content.lines().enumerate() {
        let line_no = index + 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        let [card_id, pin, balance] = fields.as_slice() else {
            return Err(Error::MalformedLedger(format!(
                "line {}: expected 3 fields, found {}",
                line_no,
                fields.len()
            )));
        };

        let balance = parse_amount(balance).map_err(|_| {
            Error::MalformedLedger(format!("line {}: invalid balance '{}'", line_no, balance))
        })?;

        let account = Account::new(*card_id, *pin, balance);
        account
            .validate()
            .map_err(|e| Error::MalformedLedger(format!("line {}: {}", line_no, e)))?;

        if !seen.insert(account.card_id.clone()) {
            return Err(Error::MalformedLedger(format!(
                "line {}: duplicate card id '{}'",
                line_no, account.card_id
            )));
        }

        accounts.push(account);
    }

    Ok(accounts)
}

/// Render account records as ledger text
pub fn render_ledger(accounts: &[Account]) -> String {
    let mut out = String::new();
    for account in accounts {
        out.push_str(&account.card_id);
        out.push(' ');
        out.push_str(&account.pin);
        out.push(' ');
        out.push_str(&format_amount(account.balance));
        out.push('\n');
    }
    out
}

impl LedgerStorage for FlatFileStorage {
    fn read_all(&self) -> Result<Vec<Account>> {
        let content = fs::read_to_string(&self.path).map_err(|e| {
            Error::storage(format!("Failed to read ledger {}: {}", self.describe(), e))
        })?;
        parse_ledger(&content)
    }

    fn write_all(&self, accounts: &[Account]) -> Result<()> {
        let _lock = self.acquire_lock()?;

        let mut temp = NamedTempFile::new_in(self.parent_dir())?;
        temp.write_all(render_ledger(accounts).as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| {
            Error::storage(format!("Failed to replace ledger {}: {}", self.describe(), e))
        })?;

        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use tempfile::tempdir;

    #[test]
    fn test_parse_skips_blank_lines() {
        let accounts = parse_ledger("1001 9999 100.0\n\n   \n1002 1234 5\n").unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].card_id, "1001");
        assert_eq!(accounts[0].balance, Decimal::new(1000, 1));
        assert_eq!(accounts[1].balance, Decimal::new(5, 0));
    }

    #[test]
    fn test_parse_rejects_wrong_field_count() {
        let err = parse_ledger("1001 9999 100.0\n1002 1234\n").unwrap_err();
        assert!(matches!(err, Error::MalformedLedger(_)));
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_parse_rejects_bad_balance() {
        assert!(matches!(
            parse_ledger("1001 9999 lots\n").unwrap_err(),
            Error::MalformedLedger(_)
        ));
        assert!(matches!(
            parse_ledger("1001 9999 -3.5\n").unwrap_err(),
            Error::MalformedLedger(_)
        ));
    }

    #[test]
    fn test_parse_rejects_duplicate_cards() {
        let err = parse_ledger("1001 9999 1\n1001 0000 2\n").unwrap_err();
        assert!(err.to_string().contains("duplicate card id '1001'"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        let storage = FlatFileStorage::new(dir.path().join("accounts.dat"));
        assert!(storage.read_all().is_err());
    }

    #[test]
    fn test_write_replaces_whole_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("accounts.dat");
        fs::write(&path, "1001 9999 100.0\n1002 1234 50\n").unwrap();

        let storage = FlatFileStorage::new(&path);
        let mut accounts = storage.read_all().unwrap();
        accounts[0].balance = Decimal::new(600, 1);
        storage.write_all(&accounts).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "1001 9999 60.0\n1002 1234 50.0\n");

        // No temp files left behind next to the ledger
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|n| n != "accounts.dat" && n != "accounts.dat.lock")
            .collect();
        assert!(leftovers.is_empty(), "unexpected files: {:?}", leftovers);
    }
}
