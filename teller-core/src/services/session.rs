//! Session service - per-connection authentication state machine
//!
//! A session starts unauthenticated. `HELO` binds a known card, `PASS`
//! with the matching PIN authenticates it, and only then are `BALA` and
//! `WDRA` served. Every rejected command gets `401 ERROR!` and leaves the
//! session usable; only `BYE`, a disconnect, or a storage failure ends it.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use uuid::Uuid;

use crate::domain::parse_withdrawal;
use crate::domain::result::{Error, Result};
use crate::services::audit::{AuditLog, LogEvent};
use crate::services::ledger::LedgerService;
use crate::services::protocol::{Command, FrameReader, Reply};

/// Authentication progress of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    CardPresented { card_id: String },
    Authenticated { card_id: String },
    Terminated,
}

/// Result of handling one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub reply: Reply,
    /// Close the connection after sending the reply
    pub close: bool,
}

impl Step {
    fn reply(reply: Reply) -> Self {
        Self { reply, close: false }
    }

    fn error() -> Self {
        Self::reply(Reply::Error)
    }
}

/// One connection's session
pub struct Session {
    id: Uuid,
    state: SessionState,
    ledger: Arc<LedgerService>,
}

impl Session {
    pub fn new(ledger: Arc<LedgerService>) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: SessionState::Unauthenticated,
            ledger,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Handle one raw command line
    ///
    /// Protocol, authentication and business-rule failures all become a
    /// `401 ERROR!` reply. Only storage failures are returned as `Err`, and
    /// the caller must abandon the connection when it sees one.
    pub fn handle_line(&mut self, line: &str) -> Result<Step> {
        match Command::parse(line) {
            Ok(command) => self.handle(command),
            Err(_) => Ok(Step::error()),
        }
    }

    /// Handle one parsed command
    pub fn handle(&mut self, command: Command) -> Result<Step> {
        if self.state == SessionState::Terminated {
            return Ok(Step::error());
        }

        match command {
            Command::Helo { card_id } => {
                // HELO restarts authentication from any live state
                if self.ledger.contains(&card_id)? {
                    self.state = SessionState::CardPresented { card_id };
                    Ok(Step::reply(Reply::AuthRequired))
                } else {
                    self.state = SessionState::Unauthenticated;
                    Ok(Step::error())
                }
            }
            Command::Pass { pin } => {
                let SessionState::CardPresented { card_id } = &self.state else {
                    return Ok(Step::error());
                };
                if self.ledger.authenticate(card_id, &pin)? {
                    self.state = SessionState::Authenticated {
                        card_id: card_id.clone(),
                    };
                    Ok(Step::reply(Reply::Ok))
                } else {
                    self.state = SessionState::Unauthenticated;
                    Ok(Step::error())
                }
            }
            Command::Bala => {
                let Some(card_id) = self.authenticated_card() else {
                    return Ok(Step::error());
                };
                match self.ledger.balance(card_id) {
                    Ok(balance) => Ok(Step::reply(Reply::Amount(balance))),
                    Err(e) if e.is_storage_failure() => Err(e),
                    Err(_) => Ok(Step::error()),
                }
            }
            Command::Wdra { amount } => {
                let Some(card_id) = self.authenticated_card() else {
                    return Ok(Step::error());
                };
                let Ok(amount) = parse_withdrawal(&amount) else {
                    return Ok(Step::error());
                };
                match self.ledger.withdraw(card_id, amount) {
                    Ok(_) => Ok(Step::reply(Reply::Ok)),
                    Err(e) if e.is_storage_failure() => Err(e),
                    Err(_) => Ok(Step::error()),
                }
            }
            Command::Bye => {
                self.state = SessionState::Terminated;
                Ok(Step {
                    reply: Reply::Bye,
                    close: true,
                })
            }
        }
    }

    fn authenticated_card(&self) -> Option<&str> {
        match &self.state {
            SessionState::Authenticated { card_id } => Some(card_id),
            _ => None,
        }
    }
}

/// How a connection ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Client sent `BYE`
    Bye,
    /// Client closed the stream without `BYE`
    Disconnected,
    /// An I/O or storage failure abandoned the session
    Failed,
}

impl SessionEnd {
    fn as_str(&self) -> &'static str {
        match self {
            SessionEnd::Bye => "bye",
            SessionEnd::Disconnected => "disconnected",
            SessionEnd::Failed => "failed",
        }
    }
}

/// Serve one connection to completion
///
/// Logs open, each command and close to the audit log. The stream is shut
/// down on every exit path; failures while doing so are ignored.
pub async fn serve_connection<S>(
    stream: S,
    peer: String,
    ledger: Arc<LedgerService>,
    audit: Arc<AuditLog>,
) -> SessionEnd
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut session = Session::new(ledger);
    let session_id = session.id().to_string();
    let event = |name: &str| {
        LogEvent::new(name)
            .with_session(session_id.as_str())
            .with_peer(peer.as_str())
    };

    audit.record(event("connection_opened"));

    let (reader, mut writer) = tokio::io::split(stream);
    let mut frames = FrameReader::new(reader);

    let outcome = run_session(&mut session, &mut frames, &mut writer, |line| {
        audit.record(event("command_received").with_command(line));
    })
    .await;

    let end = match outcome {
        Ok(end) => end,
        Err(e) => {
            audit.record(event("session_error").with_error(e.to_string()));
            SessionEnd::Failed
        }
    };

    let _ = writer.shutdown().await;
    audit.record(event("connection_closed").with_detail(end.as_str()));

    end
}

async fn run_session<R, W, F>(
    session: &mut Session,
    frames: &mut FrameReader<R>,
    writer: &mut W,
    mut on_command: F,
) -> Result<SessionEnd>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    F: FnMut(&str),
{
    while let Some(frame) = frames.next_frame().await.map_err(Error::Io)? {
        on_command(&frame.text);

        let step = session.handle_line(&frame.text)?;
        writer
            .write_all(frame.encode_reply(&step.reply).as_bytes())
            .await?;
        writer.flush().await?;

        if step.close {
            return Ok(SessionEnd::Bye);
        }
    }

    Ok(SessionEnd::Disconnected)
}
