//! Accounts command - show the ledger without PINs

use anyhow::Result;
use comfy_table::{Cell, CellAlignment};
use teller_core::domain::format_amount;

use super::get_context;
use crate::output;

pub fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let accounts = ctx.ledger.accounts()?;

    if json {
        // PINs are skipped by Account's serializer
        println!("{}", serde_json::to_string_pretty(&accounts)?);
        return Ok(());
    }

    if accounts.is_empty() {
        output::info("Ledger is empty.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Card", "Balance"]);
    for account in &accounts {
        table.add_row(vec![
            Cell::new(&account.card_id),
            Cell::new(format_amount(account.balance)).set_alignment(CellAlignment::Right),
        ]);
    }

    println!("{}", table);
    println!("{} accounts in {}", accounts.len(), ctx.ledger.storage_location());
    Ok(())
}
