//! Logs command - view the audit log

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use teller_core::services::AuditLog;

use super::get_config;
use crate::output;

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Show recent log entries
    List {
        /// Number of entries to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Show only errors
        #[arg(long)]
        errors: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show log statistics and file path
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn get_audit_log() -> Result<AuditLog> {
    let (teller_dir, config) = get_config()?;
    std::fs::create_dir_all(&teller_dir)?;
    AuditLog::open(&config.audit_path(&teller_dir))
}

pub fn run(command: LogsCommands) -> Result<()> {
    match command {
        LogsCommands::List { limit, errors, json } => {
            let audit = get_audit_log()?;
            let entries = if errors {
                audit.get_errors(limit)?
            } else {
                audit.get_recent(limit)?
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
                return Ok(());
            }

            if entries.is_empty() {
                println!("No log entries found.");
                return Ok(());
            }

            let mut table = output::create_table();
            table.set_header(vec!["Time", "Event", "Details", "Error"]);

            for entry in &entries {
                let error_indicator = if entry.is_error() {
                    "!".red().to_string()
                } else {
                    String::new()
                };

                table.add_row(vec![
                    entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                    entry.event.clone(),
                    entry.fields.clone(),
                    error_indicator,
                ]);
            }

            println!("{}", table);

            if !errors {
                let errors_list = audit.get_errors(3)?;
                if !errors_list.is_empty() {
                    println!();
                    println!("{}", "Recent Errors:".red().bold());
                    for err in &errors_list {
                        println!(
                            "  {} [{}]: {}",
                            err.timestamp.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
                            err.event,
                            err.fields
                        );
                    }
                }
            }
        }
        LogsCommands::Stats { json } => {
            let audit = get_audit_log()?;
            let total = audit.count()?;
            let errors = audit.get_errors(usize::MAX)?.len();
            let path = audit.path().to_path_buf();
            let size_bytes = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);

            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "total_entries": total,
                        "error_count": errors,
                        "log_path": path.to_string_lossy(),
                        "log_size_bytes": size_bytes
                    })
                );
            } else {
                println!("{}", "Log Statistics".bold());
                println!("  Total entries: {}", total);
                println!("  Errors: {}", errors);
                println!("  File: {}", path.display());
                println!("  Size: {} bytes", size_bytes);
            }
        }
    }

    Ok(())
}
