//! Audit log service - append-only, timestamped event log
//!
//! Every session writes its lifecycle here: connection open, each command
//! received, connection close, and any error that abandoned the session.
//! PINs are never written; the argument of `PASS` is redacted.
//!
//! Line format:
//!
//! ```text
//! 2024-05-01 12:00:00 - command_received session=... peer=127.0.0.1:50000 command="BALA"
//! ```

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Replace the argument of a `PASS` command so PINs never reach the log
pub fn redact_command(command: &str) -> String {
    let trimmed = command.trim();
    match trimmed.split_once(char::is_whitespace) {
        Some(("PASS", _)) => "PASS ****".to_string(),
        _ => trimmed.to_string(),
    }
}

/// An event to be recorded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl LogEvent {
    /// Create a new log event with just an event name
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            session: None,
            peer: None,
            command: None,
            detail: None,
            error_message: None,
        }
    }

    /// Set the session id
    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        self.session = Some(session.into());
        self
    }

    /// Set the remote peer address
    pub fn with_peer(mut self, peer: impl Into<String>) -> Self {
        self.peer = Some(peer.into());
        self
    }

    /// Set the received command (redacted before storing)
    pub fn with_command(mut self, command: &str) -> Self {
        self.command = Some(redact_command(command));
        self
    }

    /// Set free-form detail
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Set error information
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    fn render(&self) -> String {
        let mut line = self.event.clone();
        let fields = [
            ("session", &self.session, false),
            ("peer", &self.peer, false),
            ("command", &self.command, true),
            ("detail", &self.detail, true),
            ("error", &self.error_message, true),
        ];
        for (key, value, quoted) in fields {
            if let Some(value) = value {
                line.push(' ');
                line.push_str(key);
                line.push('=');
                if quoted {
                    line.push_str(&format!("{:?}", value));
                } else {
                    line.push_str(value);
                }
            }
        }
        line
    }
}

/// A log line read back from the audit file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: NaiveDateTime,
    pub event: String,
    /// Everything after the event name, as written
    pub fields: String,
}

impl LogEntry {
    /// Parse one audit line; returns None for lines not in audit format
    pub fn parse(line: &str) -> Option<Self> {
        let (timestamp, message) = line.split_once(" - ")?;
        let timestamp = NaiveDateTime::parse_from_str(timestamp.trim(), TIMESTAMP_FORMAT).ok()?;
        let message = message.trim();
        let (event, fields) = message.split_once(' ').unwrap_or((message, ""));
        if event.is_empty() {
            return None;
        }
        Some(Self {
            timestamp,
            event: event.to_string(),
            fields: fields.to_string(),
        })
    }

    /// Whether the line carries an `error` field
    ///
    /// Only a field at a boundary counts, so `error=` typed into a quoted
    /// command or detail value does not.
    pub fn is_error(&self) -> bool {
        self.fields.starts_with("error=\"") || self.fields.contains(" error=\"")
    }
}

/// Append-only audit log backed by a text file
pub struct AuditLog {
    file: Mutex<File>,
    path: PathBuf,
}

impl AuditLog {
    /// Open (or create) the audit log at `path` for appending
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open audit log: {:?}", path))?;

        Ok(Self {
            file: Mutex::new(file),
            path: path.to_path_buf(),
        })
    }

    /// Append an event
    pub fn log(&self, event: LogEvent) -> Result<()> {
        let line = format!(
            "{} - {}\n",
            Local::now().format(TIMESTAMP_FORMAT),
            event.render()
        );
        let mut file = self.file.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        file.write_all(line.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    /// Append an event, ignoring failures (logging must never break a session)
    pub fn record(&self, event: LogEvent) {
        let _ = self.log(event);
    }

    /// Log a simple event with just a name
    pub fn log_event(&self, event: &str) -> Result<()> {
        self.log(LogEvent::new(event))
    }

    /// Log an error
    pub fn log_error(&self, event: &str, message: &str) -> Result<()> {
        self.log(LogEvent::new(event).with_error(message))
    }

    fn read_entries(&self) -> Result<Vec<LogEntry>> {
        let file = File::open(&self.path)
            .with_context(|| format!("Failed to read audit log: {:?}", self.path))?;
        let mut entries = Vec::new();
        for line in BufReader::new(file).lines() {
            if let Some(entry) = LogEntry::parse(&line?) {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    /// Most recent entries first, up to `limit`
    pub fn get_recent(&self, limit: usize) -> Result<Vec<LogEntry>> {
        Ok(self.read_entries()?.into_iter().rev().take(limit).collect())
    }

    /// Most recent error entries first, up to `limit`
    pub fn get_errors(&self, limit: usize) -> Result<Vec<LogEntry>> {
        Ok(self
            .read_entries()?
            .into_iter()
            .rev()
            .filter(LogEntry::is_error)
            .take(limit)
            .collect())
    }

    /// Total number of entries
    pub fn count(&self) -> Result<usize> {
        Ok(self.read_entries()?.len())
    }

    /// Get the path to the audit file
    pub fn path(&self) -> &Path {
        &self.path
    }
}
