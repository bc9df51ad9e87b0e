//! CLI command implementations

pub mod accounts;
pub mod client;
pub mod init;
pub mod logs;
pub mod serve;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use teller_core::config::Config;
use teller_core::TellerContext;

/// Get the teller data directory from environment or default
pub fn get_teller_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("TELLER_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".teller"))
        .ok_or_else(|| anyhow!("Could not find home directory; set TELLER_DIR"))
}

/// Load settings for the data directory without touching the ledger
pub fn get_config() -> Result<(PathBuf, Config)> {
    let teller_dir = get_teller_dir()?;
    let config = Config::load(&teller_dir)?;
    Ok((teller_dir, config))
}

/// Load configuration and ledger
pub fn get_context() -> Result<TellerContext> {
    let (teller_dir, config) = get_config()?;
    context_for(teller_dir, config)
}

pub fn context_for(teller_dir: PathBuf, config: Config) -> Result<TellerContext> {
    TellerContext::with_config(&teller_dir, config).context("Failed to initialize teller context")
}
