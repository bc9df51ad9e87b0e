//! In-memory ledger storage for tests and fixtures

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use crate::domain::result::{Error, Result};
use crate::domain::Account;
use crate::ports::LedgerStorage;

/// Ledger storage held entirely in memory
///
/// Records every write so tests can assert on what was persisted, and can
/// be switched into a failing mode to exercise write-failure paths.
pub struct MemoryStorage {
    accounts: RwLock<Vec<Account>>,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
}

impl MemoryStorage {
    pub fn new(accounts: Vec<Account>) -> Self {
        Self {
            accounts: RwLock::new(accounts),
            writes: AtomicUsize::new(0),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Accounts as last written
    pub fn snapshot(&self) -> Vec<Account> {
        self.accounts
            .read()
            .map(|a| a.clone())
            .unwrap_or_default()
    }

    /// Number of successful `write_all` calls
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make every subsequent write fail (or succeed again)
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl LedgerStorage for MemoryStorage {
    fn read_all(&self) -> Result<Vec<Account>> {
        let accounts = self
            .accounts
            .read()
            .map_err(|e| Error::storage(format!("Lock poisoned: {}", e)))?;
        Ok(accounts.clone())
    }

    fn write_all(&self, accounts: &[Account]) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::storage("simulated write failure"));
        }
        let mut stored = self
            .accounts
            .write()
            .map_err(|e| Error::storage(format!("Lock poisoned: {}", e)))?;
        *stored = accounts.to_vec();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
