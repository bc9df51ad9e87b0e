//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific part of the session server.

pub mod audit;
pub mod client;
pub mod ledger;
pub mod protocol;
pub mod server;
pub mod session;

pub use audit::{AuditLog, LogEntry, LogEvent};
pub use client::Client;
pub use ledger::LedgerService;
pub use protocol::{Command, Frame, FrameReader, Reply};
pub use server::Server;
pub use session::{serve_connection, Session, SessionEnd, SessionState, Step};
