//! Serve command - run the session server in the foreground

use anyhow::{Context, Result};
use colored::Colorize;
use teller_core::config::AcceptMode;

use super::{context_for, get_config};

pub fn run(port: Option<u16>, bind: Option<String>, sequential: bool) -> Result<()> {
    let (teller_dir, mut config) = get_config()?;
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(bind) = bind {
        config.bind_address = bind;
    }
    if sequential {
        config.accept_mode = AcceptMode::Sequential;
    }

    let ctx = context_for(teller_dir, config)?;

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(async {
        let server = ctx.bind_server().await?;
        let local = server.local_addr()?;

        println!(
            "{} {} ({} accounts, {:?} mode)",
            "Listening on".green(),
            local.to_string().bold(),
            ctx.ledger.len()?,
            ctx.config.accept_mode
        );
        println!("  Ledger: {}", ctx.ledger.storage_location().dimmed());
        println!("  Audit log: {}", ctx.audit.path().display().to_string().dimmed());
        println!("{}", "Press Ctrl+C to stop".dimmed());

        server
            .run_until(async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await?;

        println!("\n{}", "Server stopped".dimmed());
        Ok(())
    })
}
