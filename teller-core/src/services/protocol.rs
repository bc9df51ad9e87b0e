//! Wire protocol - commands, replies and framing
//!
//! Commands are ASCII lines of space-separated fields with exact, case
//! sensitive verbs:
//!
//! | Command          | Replies                          |
//! |------------------|----------------------------------|
//! | `HELO <card_id>` | `500 AUTH REQUIRE`, `401 ERROR!` |
//! | `PASS <pin>`     | `525 OK!`, `401 ERROR!`          |
//! | `BALA`           | `AMNT:<balance>`, `401 ERROR!`   |
//! | `WDRA <amount>`  | `525 OK!`, `401 ERROR!`          |
//! | `BYE`            | `BYE`                            |

use std::collections::VecDeque;
use std::fmt;

use rust_decimal::Decimal;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::domain::format_amount;
use crate::domain::result::{Error, Result};

const READ_CHUNK: usize = 1024;

/// A parsed client command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Helo { card_id: String },
    Pass { pin: String },
    Bala,
    /// Amount is kept raw; validating it is a business rule
    Wdra { amount: String },
    Bye,
}

impl Command {
    /// Parse a single command line (without its terminator)
    pub fn parse(line: &str) -> Result<Self> {
        let mut fields = line.split_whitespace();
        let verb = fields
            .next()
            .ok_or_else(|| Error::protocol("empty command"))?;
        let args: Vec<&str> = fields.collect();

        let command = match (verb, args.as_slice()) {
            ("HELO", [card_id]) => Command::Helo {
                card_id: card_id.to_string(),
            },
            ("PASS", [pin]) => Command::Pass {
                pin: pin.to_string(),
            },
            ("BALA", []) => Command::Bala,
            ("WDRA", [amount]) => Command::Wdra {
                amount: amount.to_string(),
            },
            ("BYE", []) => Command::Bye,
            ("HELO" | "PASS" | "BALA" | "WDRA" | "BYE", _) => {
                return Err(Error::protocol(format!(
                    "wrong number of arguments for {}",
                    verb
                )))
            }
            _ => return Err(Error::protocol(format!("unknown verb '{}'", verb))),
        };

        Ok(command)
    }

    /// Render the command as sent on the wire (without terminator)
    pub fn to_wire(&self) -> String {
        match self {
            Command::Helo { card_id } => format!("HELO {}", card_id),
            Command::Pass { pin } => format!("PASS {}", pin),
            Command::Bala => "BALA".to_string(),
            Command::Wdra { amount } => format!("WDRA {}", amount),
            Command::Bye => "BYE".to_string(),
        }
    }
}

/// A server reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `500 AUTH REQUIRE`: card accepted, PIN expected
    AuthRequired,
    /// `525 OK!`: authentication or withdrawal succeeded
    Ok,
    /// `401 ERROR!`: universal failure
    Error,
    /// `AMNT:<balance>`
    Amount(Decimal),
    /// `BYE`
    Bye,
}

impl Reply {
    /// Parse a reply as received by a client
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        match raw {
            "500 AUTH REQUIRE" => Ok(Reply::AuthRequired),
            "525 OK!" => Ok(Reply::Ok),
            "401 ERROR!" => Ok(Reply::Error),
            "BYE" => Ok(Reply::Bye),
            _ => match raw.strip_prefix("AMNT:") {
                Some(amount) => crate::domain::parse_amount(amount).map(Reply::Amount),
                None => Err(Error::protocol(format!("unexpected reply '{}'", raw))),
            },
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::AuthRequired => write!(f, "500 AUTH REQUIRE"),
            Reply::Ok => write!(f, "525 OK!"),
            Reply::Error => write!(f, "401 ERROR!"),
            Reply::Amount(amount) => write!(f, "AMNT:{}", format_amount(*amount)),
            Reply::Bye => write!(f, "BYE"),
        }
    }
}

/// One request read off the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub text: String,
    /// Whether the request ended with a newline; replies mirror it
    pub terminated: bool,
}

impl Frame {
    /// Encode a reply the way this frame's sender expects it
    pub fn encode_reply(&self, reply: &Reply) -> String {
        if self.terminated {
            format!("{}\n", reply)
        } else {
            reply.to_string()
        }
    }
}

/// Splits a byte stream into command frames
///
/// Newline-terminated lines are the normal case. Until the first newline
/// shows up, a read that delivers bytes with no newline at all is taken as
/// one whole command, which is how clients that write one bare command per
/// send are served. After the first newline the connection is in line mode
/// for good: partial lines are buffered until their terminator arrives.
pub struct FrameReader<R> {
    inner: R,
    buf: Vec<u8>,
    pending: VecDeque<Frame>,
    line_mode: bool,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::new(),
            pending: VecDeque::new(),
            line_mode: false,
        }
    }

    /// Whether a newline has been seen on this connection
    pub fn is_line_mode(&self) -> bool {
        self.line_mode
    }

    /// Next non-blank frame, or None once the peer has closed the stream
    pub async fn next_frame(&mut self) -> std::io::Result<Option<Frame>> {
        loop {
            if let Some(frame) = self.pending.pop_front() {
                return Ok(Some(frame));
            }

            let mut chunk = [0u8; READ_CHUNK];
            let n = self.inner.read(&mut chunk).await?;
            if n == 0 {
                return Ok(self.take_remainder());
            }
            self.buf.extend_from_slice(&chunk[..n]);

            while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = self.buf.drain(..=pos).collect();
                self.line_mode = true;
                self.push(&line, true);
            }

            if !self.line_mode && self.pending.is_empty() {
                if let Some(frame) = self.take_remainder() {
                    self.pending.push_back(frame);
                }
            }
        }
    }

    fn push(&mut self, bytes: &[u8], terminated: bool) {
        let text = String::from_utf8_lossy(bytes).trim().to_string();
        if !text.is_empty() {
            self.pending.push_back(Frame { text, terminated });
        }
    }

    fn take_remainder(&mut self) -> Option<Frame> {
        let bytes = std::mem::take(&mut self.buf);
        let text = String::from_utf8_lossy(&bytes).trim().to_string();
        (!text.is_empty()).then_some(Frame {
            text,
            terminated: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            Command::parse("HELO 1001").unwrap(),
            Command::Helo {
                card_id: "1001".to_string()
            }
        );
        assert_eq!(
            Command::parse("PASS 9999").unwrap(),
            Command::Pass {
                pin: "9999".to_string()
            }
        );
        assert_eq!(Command::parse("BALA").unwrap(), Command::Bala);
        assert_eq!(
            Command::parse("WDRA 40.5").unwrap(),
            Command::Wdra {
                amount: "40.5".to_string()
            }
        );
        assert_eq!(Command::parse("  BYE  ").unwrap(), Command::Bye);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(Command::parse("").is_err());
        assert!(Command::parse("helo 1001").is_err());
        assert!(Command::parse("HELO").is_err());
        assert!(Command::parse("HELO 1001 extra").is_err());
        assert!(Command::parse("BALA now").is_err());
        assert!(Command::parse("XFER 1001 1002 5").is_err());
    }

    #[test]
    fn test_reply_wire_text() {
        assert_eq!(Reply::AuthRequired.to_string(), "500 AUTH REQUIRE");
        assert_eq!(Reply::Ok.to_string(), "525 OK!");
        assert_eq!(Reply::Error.to_string(), "401 ERROR!");
        assert_eq!(Reply::Bye.to_string(), "BYE");
        assert_eq!(Reply::Amount(Decimal::new(100, 0)).to_string(), "AMNT:100.0");
        assert_eq!(Reply::Amount(Decimal::new(6025, 2)).to_string(), "AMNT:60.25");
    }

    #[test]
    fn test_reply_parse() {
        assert_eq!(Reply::parse("525 OK!\n").unwrap(), Reply::Ok);
        assert_eq!(
            Reply::parse("AMNT:60.0").unwrap(),
            Reply::Amount(Decimal::new(60, 0))
        );
        assert!(Reply::parse("200 WHATEVER").is_err());
    }

    #[test]
    fn test_frame_reply_mirrors_request() {
        let line = Frame {
            text: "BALA".to_string(),
            terminated: true,
        };
        let bare = Frame {
            text: "BALA".to_string(),
            terminated: false,
        };
        assert_eq!(line.encode_reply(&Reply::Ok), "525 OK!\n");
        assert_eq!(bare.encode_reply(&Reply::Ok), "525 OK!");
    }

    #[tokio::test]
    async fn test_frame_reader_splits_lines() {
        let (mut client, server) = tokio::io::duplex(256);
        client
            .write_all(b"HELO 1001\r\nPASS 9999\n\nBALA\n")
            .await
            .unwrap();
        drop(client);

        let mut reader = FrameReader::new(server);
        let mut frames = Vec::new();
        while let Some(frame) = reader.next_frame().await.unwrap() {
            frames.push(frame);
        }

        let texts: Vec<_> = frames.iter().map(|f| f.text.as_str()).collect();
        assert_eq!(texts, vec!["HELO 1001", "PASS 9999", "BALA"]);
        assert!(frames.iter().all(|f| f.terminated));
    }

    #[tokio::test]
    async fn test_frame_reader_joins_split_line() {
        let (mut client, server) = tokio::io::duplex(256);
        let mut reader = FrameReader::new(server);

        client.write_all(b"BALA\n").await.unwrap();
        assert_eq!(reader.next_frame().await.unwrap().unwrap().text, "BALA");
        assert!(reader.is_line_mode());

        client.write_all(b"HELO 10").await.unwrap();
        let next = tokio::spawn(async move {
            let frame = reader.next_frame().await.unwrap();
            (frame, reader)
        });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        client.write_all(b"01\nBYE\n").await.unwrap();

        let (frame, mut reader) = next.await.unwrap();
        assert_eq!(
            frame,
            Some(Frame {
                text: "HELO 1001".to_string(),
                terminated: true,
            })
        );
        assert_eq!(reader.next_frame().await.unwrap().unwrap().text, "BYE");
    }

    #[tokio::test]
    async fn test_frame_reader_bare_chunk() {
        let (mut client, server) = tokio::io::duplex(256);
        let mut reader = FrameReader::new(server);

        client.write_all(b"HELO 1001").await.unwrap();
        let frame = reader.next_frame().await.unwrap().unwrap();
        assert_eq!(frame.text, "HELO 1001");
        assert!(!frame.terminated);

        drop(client);
        assert!(reader.next_frame().await.unwrap().is_none());
    }
}
