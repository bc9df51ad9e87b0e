//! Protocol client - speaks the line protocol to a running server

use anyhow::{anyhow, Context, Result};
use rust_decimal::Decimal;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::services::protocol::{Command, Reply};

/// A connected protocol client
///
/// Sends newline-terminated commands and reads one reply line each.
pub struct Client {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Client {
    pub async fn connect(address: &str) -> Result<Self> {
        let stream = TcpStream::connect(address)
            .await
            .with_context(|| format!("Failed to connect to {}", address))?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(reader),
            writer,
        })
    }

    /// Send a raw line and return the raw reply (without terminator)
    pub async fn send_line(&mut self, line: &str) -> Result<String> {
        self.writer.write_all(format!("{}\n", line).as_bytes()).await?;
        self.writer.flush().await?;

        let mut reply = String::new();
        let n = self.reader.read_line(&mut reply).await?;
        if n == 0 {
            return Err(anyhow!("Server closed the connection"));
        }
        Ok(reply.trim_end().to_string())
    }

    /// Send a command and parse the reply
    pub async fn send(&mut self, command: &Command) -> Result<Reply> {
        let raw = self.send_line(&command.to_wire()).await?;
        Ok(Reply::parse(&raw)?)
    }

    /// Present a card; true when the server asks for a PIN
    pub async fn helo(&mut self, card_id: &str) -> Result<bool> {
        let reply = self
            .send(&Command::Helo {
                card_id: card_id.to_string(),
            })
            .await?;
        Ok(reply == Reply::AuthRequired)
    }

    /// Submit a PIN; true when authenticated
    pub async fn pass(&mut self, pin: &str) -> Result<bool> {
        let reply = self.send(&Command::Pass { pin: pin.to_string() }).await?;
        Ok(reply == Reply::Ok)
    }

    /// Present a card and PIN in one go
    pub async fn login(&mut self, card_id: &str, pin: &str) -> Result<bool> {
        Ok(self.helo(card_id).await? && self.pass(pin).await?)
    }

    /// Query the balance; None if the server refused
    pub async fn balance(&mut self) -> Result<Option<Decimal>> {
        match self.send(&Command::Bala).await? {
            Reply::Amount(amount) => Ok(Some(amount)),
            _ => Ok(None),
        }
    }

    /// Withdraw an amount; true on success
    pub async fn withdraw(&mut self, amount: &str) -> Result<bool> {
        let reply = self
            .send(&Command::Wdra {
                amount: amount.to_string(),
            })
            .await?;
        Ok(reply == Reply::Ok)
    }

    /// End the session
    ///
    /// The server's `BYE` is read if it arrives; a missing acknowledgment is
    /// not an error.
    pub async fn bye(mut self) -> Result<()> {
        self.writer.write_all(b"BYE\n").await?;
        self.writer.flush().await?;
        let mut reply = String::new();
        let _ = self.reader.read_line(&mut reply).await;
        Ok(())
    }
}
