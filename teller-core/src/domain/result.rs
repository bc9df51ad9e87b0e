//! Result and error types for the core library

use rust_decimal::Decimal;
use thiserror::Error;

/// Core library error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: Decimal, requested: Decimal },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Malformed ledger: {0}")]
    MalformedLedger(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Errors that mean durable state could not be read or written.
    ///
    /// A session that hits one of these is abandoned rather than answered.
    pub fn is_storage_failure(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Io(_))
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_failure_classification() {
        assert!(Error::storage("disk full").is_storage_failure());
        assert!(Error::Io(std::io::Error::other("broken pipe")).is_storage_failure());
        assert!(!Error::not_found("1001").is_storage_failure());
        assert!(!Error::InvalidAmount("-5".to_string()).is_storage_failure());
    }

    #[test]
    fn test_insufficient_funds_message() {
        let err = Error::InsufficientFunds {
            balance: Decimal::new(600, 1),
            requested: Decimal::new(1000, 0),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient funds: balance 60.0, requested 1000"
        );
    }
}
