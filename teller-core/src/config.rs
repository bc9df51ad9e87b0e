//! Configuration management
//!
//! Settings live in `settings.json` in the data directory:
//! ```json
//! {
//!   "server": { "port": 2560, "bindAddress": "0.0.0.0", "acceptMode": "concurrent" },
//!   "ledger": { "file": "accounts.dat" },
//!   "audit": { "file": "server.log" }
//! }
//! ```
//! Every key is optional. `TELLER_PORT` and `TELLER_BIND` override the file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::result::Error;

pub const DEFAULT_PORT: u16 = 2560;
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_LEDGER_FILE: &str = "accounts.dat";
pub const DEFAULT_AUDIT_FILE: &str = "server.log";

/// How the acceptor schedules sessions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcceptMode {
    /// One task per connection
    #[default]
    Concurrent,
    /// Serve each session to completion before accepting the next
    Sequential,
}

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    server: ServerSettings,
    #[serde(default)]
    ledger: FileSettings,
    #[serde(default)]
    audit: FileSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bind_address: Option<String>,
    #[serde(default)]
    accept_mode: AcceptMode,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    file: Option<String>,
}

/// Teller configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub bind_address: String,
    pub accept_mode: AcceptMode,
    /// Ledger file name, relative to the data directory unless absolute
    pub ledger_file: String,
    /// Audit log file name, relative to the data directory unless absolute
    pub audit_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            accept_mode: AcceptMode::Concurrent,
            ledger_file: DEFAULT_LEDGER_FILE.to_string(),
            audit_file: DEFAULT_AUDIT_FILE.to_string(),
        }
    }
}

impl Config {
    /// Load config from the data directory
    ///
    /// A missing settings file means defaults. A settings file that exists
    /// but cannot be parsed is an error: the server must not start on a
    /// guessed port.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let settings_path = data_dir.join("settings.json");

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid settings file: {:?}", settings_path))?
        } else {
            SettingsFile::default()
        };

        let mut config = Self::from_settings(raw);
        config.apply_env()?;
        Ok(config)
    }

    fn from_settings(raw: SettingsFile) -> Self {
        let defaults = Self::default();
        Self {
            port: raw.server.port.unwrap_or(defaults.port),
            bind_address: raw.server.bind_address.unwrap_or(defaults.bind_address),
            accept_mode: raw.server.accept_mode,
            ledger_file: raw.ledger.file.unwrap_or(defaults.ledger_file),
            audit_file: raw.audit.file.unwrap_or(defaults.audit_file),
        }
    }

    fn apply_env(&mut self) -> crate::domain::result::Result<()> {
        if let Ok(port) = std::env::var("TELLER_PORT") {
            self.port = port
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("Invalid TELLER_PORT: {}", port)))?;
        }
        if let Ok(bind) = std::env::var("TELLER_BIND") {
            if !bind.trim().is_empty() {
                self.bind_address = bind.trim().to_string();
            }
        }
        Ok(())
    }

    /// Save config to the data directory
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let settings = SettingsFile {
            server: ServerSettings {
                port: Some(self.port),
                bind_address: Some(self.bind_address.clone()),
                accept_mode: self.accept_mode,
            },
            ledger: FileSettings {
                file: Some(self.ledger_file.clone()),
            },
            audit: FileSettings {
                file: Some(self.audit_file.clone()),
            },
        };

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(data_dir.join("settings.json"), content)?;
        Ok(())
    }

    /// `host:port` the acceptor binds to
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    /// Full path of the ledger file
    pub fn ledger_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.ledger_file)
    }

    /// Full path of the audit log
    pub fn audit_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.audit_file)
    }
}
