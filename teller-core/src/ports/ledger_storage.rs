//! Ledger storage port - durable backing store abstraction

use crate::domain::result::Result;
use crate::domain::Account;

/// Durable backing store for the ledger
///
/// The ledger is small and rewritten in full on every mutation, so the
/// contract is whole-snapshot only: read everything at startup, write
/// everything after each balance change.
pub trait LedgerStorage: Send + Sync {
    /// Read every account record
    ///
    /// Fails if the store is missing or any record is malformed.
    fn read_all(&self) -> Result<Vec<Account>>;

    /// Replace the stored ledger with `accounts`
    ///
    /// Must either fully succeed or leave the previous contents intact.
    fn write_all(&self, accounts: &[Account]) -> Result<()>;

    /// Human-readable location, used in operator messages
    fn describe(&self) -> String;
}

impl<T: LedgerStorage + ?Sized> LedgerStorage for std::sync::Arc<T> {
    fn read_all(&self) -> Result<Vec<Account>> {
        (**self).read_all()
    }

    fn write_all(&self, accounts: &[Account]) -> Result<()> {
        (**self).write_all(accounts)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
