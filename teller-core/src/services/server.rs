//! Connection acceptor - listens for clients and runs one session each

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::task::JoinSet;

use crate::config::AcceptMode;
use crate::services::audit::{AuditLog, LogEvent};
use crate::services::ledger::LedgerService;
use crate::services::session::serve_connection;

/// How long running sessions get to finish once shutdown is requested
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// A bound listener ready to serve sessions
pub struct Server {
    listener: TcpListener,
    mode: AcceptMode,
    ledger: Arc<LedgerService>,
    audit: Arc<AuditLog>,
    shutdown_grace: Duration,
}

impl Server {
    /// Bind the listening socket
    pub async fn bind(
        address: &str,
        mode: AcceptMode,
        ledger: Arc<LedgerService>,
        audit: Arc<AuditLog>,
    ) -> Result<Self> {
        let listener = TcpListener::bind(address)
            .await
            .with_context(|| format!("Failed to bind {}", address))?;

        Ok(Self {
            listener,
            mode,
            ledger,
            audit,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        })
    }

    /// Override how long sessions may run on after shutdown is requested
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Address actually bound (useful when binding port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until the process is killed
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Serve until `shutdown` resolves
    ///
    /// Stops accepting once the signal fires. Sessions still running get the
    /// shutdown grace period to finish and are then aborted, which closes
    /// their connections. A sequential session in progress is aborted as
    /// soon as the signal fires.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let local = self.local_addr()?;
        self.audit.record(
            LogEvent::new("server_started")
                .with_detail(format!("addr={} mode={:?}", local, self.mode)),
        );

        let mut sessions = JoinSet::new();
        let mut aborted = 0;
        tokio::pin!(shutdown);

        loop {
            let accepted = tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.listener.accept() => accepted,
            };

            let (stream, peer) = match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    eprintln!("[teller] accept failed: {}", e);
                    self.audit
                        .record(LogEvent::new("accept_error").with_error(e.to_string()));
                    continue;
                }
            };

            let session = serve_connection(
                stream,
                peer.to_string(),
                Arc::clone(&self.ledger),
                Arc::clone(&self.audit),
            );

            match self.mode {
                AcceptMode::Concurrent => {
                    sessions.spawn(session);
                }
                AcceptMode::Sequential => {
                    tokio::select! {
                        _ = session => {}
                        _ = &mut shutdown => {
                            aborted += 1;
                            break;
                        }
                    }
                }
            }

            // Reap finished sessions so the set does not grow unbounded
            while sessions.try_join_next().is_some() {}
        }

        let drained = tokio::time::timeout(self.shutdown_grace, async {
            while sessions.join_next().await.is_some() {}
        })
        .await
        .is_ok();

        if !drained {
            aborted += sessions.len();
            eprintln!(
                "[teller] aborting {} session(s) still open after {:?}",
                sessions.len(),
                self.shutdown_grace
            );
            sessions.shutdown().await;
        }

        self.audit
            .record(LogEvent::new("server_stopped").with_detail(format!("aborted={}", aborted)));
        Ok(())
    }
}
