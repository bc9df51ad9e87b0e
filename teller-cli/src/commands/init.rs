//! Init command - create the data directory and default settings

use anyhow::{Context, Result};
use colored::Colorize;
use dialoguer::Confirm;
use teller_core::config::Config;

use super::get_teller_dir;
use crate::output;

pub fn run(force: bool) -> Result<()> {
    let teller_dir = get_teller_dir()?;
    std::fs::create_dir_all(&teller_dir)
        .with_context(|| format!("Failed to create teller directory: {:?}", teller_dir))?;

    let settings_path = teller_dir.join("settings.json");
    if settings_path.exists() && !force {
        println!(
            "\n{}",
            format!("Settings already exist at {}", settings_path.display()).yellow()
        );
        if !Confirm::new()
            .with_prompt("Overwrite with defaults?")
            .default(false)
            .interact()?
        {
            println!("{}\n", "Cancelled".dimmed());
            return Ok(());
        }
    }

    let config = Config::default();
    config.save(&teller_dir)?;
    output::success(&format!("Wrote {}", settings_path.display()));

    let ledger_path = config.ledger_path(&teller_dir);
    if !ledger_path.exists() {
        output::warning(&format!(
            "No ledger at {}. Create it with one `<card> <pin> <balance>` line per account.",
            ledger_path.display()
        ));
    }

    Ok(())
}
