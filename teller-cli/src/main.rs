//! Teller CLI - run and poke at the remote-banking session server

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{accounts, client, init, logs, serve};

/// Teller - a minimal remote-banking session server
#[derive(Parser)]
#[command(name = "teller", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the session server
    Serve {
        /// Port to listen on (overrides settings.json)
        #[arg(long, short)]
        port: Option<u16>,
        /// Address to bind (overrides settings.json)
        #[arg(long)]
        bind: Option<String>,
        /// Serve one session at a time
        #[arg(long)]
        sequential: bool,
    },

    /// Write a default settings.json to the data directory
    Init {
        /// Overwrite existing settings without asking
        #[arg(long, short)]
        force: bool,
    },

    /// List accounts and balances from the ledger
    Accounts {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// View the audit log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },

    /// Interactive client for a running server
    Client {
        /// Server address
        #[arg(long, default_value = "127.0.0.1:2560")]
        addr: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = run(cli);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Serve { port, bind, sequential } => serve::run(port, bind, sequential),
        Commands::Init { force } => init::run(force),
        Commands::Accounts { json } => accounts::run(json),
        Commands::Logs { command } => logs::run(command),
        Commands::Client { addr } => client::run(&addr),
    }
}
