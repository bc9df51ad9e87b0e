//! Account domain model

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

/// A card account held in the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Card number, unique across the ledger
    pub card_id: String,
    /// Plaintext PIN. Never serialized into operator output.
    #[serde(skip_serializing, default)]
    pub pin: String,
    pub balance: Decimal,
}

impl Account {
    /// Create a new account record
    pub fn new(card_id: impl Into<String>, pin: impl Into<String>, balance: Decimal) -> Self {
        Self {
            card_id: card_id.into(),
            pin: pin.into(),
            balance,
        }
    }

    /// Validate account data
    pub fn validate(&self) -> std::result::Result<(), &'static str> {
        if self.card_id.trim().is_empty() {
            return Err("card id cannot be empty");
        }
        if self.card_id.chars().any(char::is_whitespace) {
            return Err("card id cannot contain whitespace");
        }
        if self.pin.is_empty() || self.pin.chars().any(char::is_whitespace) {
            return Err("pin must be a single non-empty token");
        }
        if self.balance.is_sign_negative() && !self.balance.is_zero() {
            return Err("balance cannot be negative");
        }
        Ok(())
    }
}

/// Compare a stored PIN with the one a client supplied.
///
/// Plain exact string equality with no hashing and no constant-time
/// guarantee. Every authentication check goes through here.
pub fn pins_match(stored: &str, supplied: &str) -> bool {
    stored == supplied
}

/// Render an amount in its shortest form with at least one fractional digit
///
/// `100` becomes `100.0`, `60.50` becomes `60.5`.
pub fn format_amount(amount: Decimal) -> String {
    let normalized = amount.normalize();
    if normalized.scale() == 0 {
        format!("{}.0", normalized)
    } else {
        normalized.to_string()
    }
}

/// Parse a decimal amount as sent by a client or stored in the ledger
///
/// Accepts plain (`40.25`) and scientific (`4e1`) notation.
pub fn parse_amount(raw: &str) -> Result<Decimal> {
    let raw = raw.trim();
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|_| Error::InvalidAmount(raw.to_string()))
}

/// Parse a withdrawal amount, which must be strictly positive
pub fn parse_withdrawal(raw: &str) -> Result<Decimal> {
    let amount = parse_amount(raw)?;
    if amount <= Decimal::ZERO {
        return Err(Error::InvalidAmount(raw.trim().to_string()));
    }
    Ok(amount)
}
