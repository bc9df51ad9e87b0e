//! Ledger service - in-memory account ledger backed by durable storage

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use rust_decimal::Decimal;

use crate::domain::result::{Error, Result};
use crate::domain::{pins_match, Account};
use crate::ports::LedgerStorage;

/// Card accounts held in memory for the process lifetime
///
/// One instance is shared by every session. All reads and the withdraw
/// read-modify-persist cycle run under the same mutex, so no withdrawal can
/// observe or persist another one's partial state.
pub struct LedgerService {
    accounts: Mutex<BTreeMap<String, Account>>,
    storage: Box<dyn LedgerStorage>,
}

impl LedgerService {
    /// Load the ledger from its backing store
    ///
    /// There is no recovery path: a missing or malformed store is an error
    /// and the caller must not start serving.
    pub fn load(storage: Box<dyn LedgerStorage>) -> Result<Self> {
        let records = storage.read_all()?;

        let mut accounts = BTreeMap::new();
        for account in records {
            if accounts.contains_key(&account.card_id) {
                return Err(Error::MalformedLedger(format!(
                    "duplicate card id '{}' in {}",
                    account.card_id,
                    storage.describe()
                )));
            }
            accounts.insert(account.card_id.clone(), account);
        }

        Ok(Self {
            accounts: Mutex::new(accounts),
            storage,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, Account>>> {
        self.accounts
            .lock()
            .map_err(|e| Error::storage(format!("Lock poisoned: {}", e)))
    }

    /// Get an account by card id
    pub fn get(&self, card_id: &str) -> Result<Account> {
        self.lock()?
            .get(card_id)
            .cloned()
            .ok_or_else(|| Error::not_found(card_id))
    }

    /// Whether a card exists in the ledger
    pub fn contains(&self, card_id: &str) -> Result<bool> {
        Ok(self.lock()?.contains_key(card_id))
    }

    /// Check a PIN against the card's stored PIN
    ///
    /// Unknown cards never authenticate.
    pub fn authenticate(&self, card_id: &str, pin: &str) -> Result<bool> {
        Ok(self
            .lock()?
            .get(card_id)
            .is_some_and(|account| pins_match(&account.pin, pin)))
    }

    /// Current balance of a card
    pub fn balance(&self, card_id: &str) -> Result<Decimal> {
        self.get(card_id).map(|account| account.balance)
    }

    /// Withdraw `amount` from a card and persist the whole ledger
    ///
    /// The new ledger is written to storage before the in-memory balance
    /// changes. If the write fails nothing is committed and the storage
    /// error is returned.
    pub fn withdraw(&self, card_id: &str, amount: Decimal) -> Result<Decimal> {
        if amount <= Decimal::ZERO {
            return Err(Error::InvalidAmount(amount.to_string()));
        }

        let mut accounts = self.lock()?;

        let balance = accounts
            .get(card_id)
            .map(|account| account.balance)
            .ok_or_else(|| Error::not_found(card_id))?;

        if amount > balance {
            return Err(Error::InsufficientFunds {
                balance,
                requested: amount,
            });
        }

        let new_balance = balance - amount;
        let candidate: Vec<Account> = accounts
            .values()
            .map(|account| {
                let mut account = account.clone();
                if account.card_id == card_id {
                    account.balance = new_balance;
                }
                account
            })
            .collect();

        self.storage.write_all(&candidate)?;

        if let Some(account) = accounts.get_mut(card_id) {
            account.balance = new_balance;
        }

        Ok(new_balance)
    }

    /// Snapshot of every account, ordered by card id
    pub fn accounts(&self) -> Result<Vec<Account>> {
        Ok(self.lock()?.values().cloned().collect())
    }

    /// Number of accounts in the ledger
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    /// Where the ledger is persisted
    pub fn storage_location(&self) -> String {
        self.storage.describe()
    }
}
