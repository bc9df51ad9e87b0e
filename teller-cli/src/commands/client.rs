//! Client command - interactive teller session against a running server

use anyhow::{Context, Result};
use colored::Colorize;
use dialoguer::{Input, Password, Select};
use teller_core::domain::format_amount;
use teller_core::Client;

use crate::output;

const ACTIONS: [&str; 3] = ["Balance", "Withdraw", "Exit"];

pub fn run(addr: &str) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(session(addr))
}

async fn session(addr: &str) -> Result<()> {
    let mut client = Client::connect(addr).await?;
    output::info(&format!("Connected to {}", addr));

    loop {
        let card: String = Input::new().with_prompt("Card number").interact_text()?;
        if !client.helo(card.trim()).await? {
            output::error("Unknown card");
            continue;
        }

        let pin = Password::new().with_prompt("PIN").interact()?;
        if client.pass(&pin).await? {
            output::success("Authenticated");
            break;
        }
        output::error("Wrong PIN");
    }

    loop {
        let choice = Select::new()
            .with_prompt("What next?")
            .items(&ACTIONS)
            .default(0)
            .interact()?;

        match ACTIONS[choice] {
            "Balance" => match client.balance().await? {
                Some(balance) => println!("Balance: {}", format_amount(balance).bold()),
                None => output::error("Balance unavailable"),
            },
            "Withdraw" => {
                let amount: String = Input::new().with_prompt("Amount").interact_text()?;
                if client.withdraw(amount.trim()).await? {
                    output::success("Withdrawal successful");
                } else {
                    output::warning("Withdrawal refused");
                }
            }
            _ => break,
        }
    }

    client.bye().await?;
    println!("{}", "Goodbye".dimmed());
    Ok(())
}
