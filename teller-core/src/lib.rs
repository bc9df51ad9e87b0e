//! Teller Core - session server for a minimal remote-banking protocol
//!
//! This crate follows hexagonal architecture:
//!
//! - **domain**: Core entities (Account, amounts, errors)
//! - **ports**: Trait definitions for external dependencies (LedgerStorage)
//! - **services**: Ledger, audit log, wire protocol, sessions, acceptor, client
//! - **adapters**: Concrete storage implementations (flat file, memory)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod services;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use adapters::FlatFileStorage;
use config::Config;
use services::{AuditLog, LedgerService, Server};

// Re-export commonly used types at crate root
pub use domain::result::Error;
pub use domain::Account;
pub use services::{Client, LogEntry, LogEvent, Reply};

/// Main context for Teller operations
///
/// Holds the configuration, the loaded ledger and the audit log for one
/// data directory.
pub struct TellerContext {
    pub config: Config,
    pub data_dir: PathBuf,
    pub ledger: Arc<LedgerService>,
    pub audit: Arc<AuditLog>,
}

impl TellerContext {
    /// Load configuration and ledger from a data directory
    ///
    /// Fails if the ledger file is missing or malformed.
    pub fn new(data_dir: &Path) -> Result<Self> {
        let config = Config::load(data_dir)?;
        Self::with_config(data_dir, config)
    }

    /// Like `new`, with an already-resolved configuration
    pub fn with_config(data_dir: &Path, config: Config) -> Result<Self> {
        let ledger_path = config.ledger_path(data_dir);
        let storage = FlatFileStorage::new(&ledger_path);
        let ledger = LedgerService::load(Box::new(storage))
            .with_context(|| format!("Failed to load ledger: {:?}", ledger_path))?;

        let audit = AuditLog::open(&config.audit_path(data_dir))?;

        Ok(Self {
            config,
            data_dir: data_dir.to_path_buf(),
            ledger: Arc::new(ledger),
            audit: Arc::new(audit),
        })
    }

    /// Bind a server for this context's configuration
    pub async fn bind_server(&self) -> Result<Server> {
        Server::bind(
            &self.config.listen_address(),
            self.config.accept_mode,
            Arc::clone(&self.ledger),
            Arc::clone(&self.audit),
        )
        .await
    }
}
