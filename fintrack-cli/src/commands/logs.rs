//! Logs command - inspect and prune the command event log

use anyhow::Result;
use chrono::{TimeZone, Utc};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;

use fintrack_core::services::logging::log_timestamp_now;
use fintrack_core::services::{EntryPoint, LogEntry, LoggingService};

use super::get_data_dir;
use crate::output;

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Show recent log entries
    List {
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Only failed commands
        #[arg(long)]
        errors: bool,
        #[arg(long)]
        json: bool,
    },
    /// Delete entries older than N days
    Clear {
        #[arg(long, default_value = "30")]
        older_than_days: u32,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
        #[arg(long)]
        json: bool,
    },
    /// Entry counts and database location
    Stats {
        #[arg(long)]
        json: bool,
    },
}

fn open_log() -> Result<LoggingService> {
    let data_dir = get_data_dir()?;
    std::fs::create_dir_all(&data_dir)?;
    Ok(LoggingService::new(&data_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION"))?)
}

fn format_ms(timestamp_ms: i64) -> String {
    Utc.timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp_ms.to_string())
}

fn entries_table(entries: &[LogEntry]) -> comfy_table::Table {
    let mut table = output::create_table();
    table.set_header(vec!["Time", "Event", "Command", "Entity", "Error"]);
    for entry in entries {
        table.add_row(vec![
            format_ms(entry.timestamp),
            entry.event.clone(),
            entry.command.clone().unwrap_or_default(),
            entry.entity.clone().unwrap_or_default(),
            entry.error_message.clone().unwrap_or_default(),
        ]);
    }
    table
}

pub fn run(command: LogsCommands) -> Result<()> {
    let log = open_log()?;

    match command {
        LogsCommands::List {
            limit,
            errors,
            json,
        } => {
            let entries = if errors {
                log.get_errors(limit)?
            } else {
                log.get_recent(limit)?
            };
            if json {
                return output::print_json(&entries);
            }
            if entries.is_empty() {
                println!("No log entries found.");
                return Ok(());
            }
            println!("{}", entries_table(&entries));
        }
        LogsCommands::Clear {
            older_than_days,
            force,
            json,
        } => {
            if !force && !json {
                let confirmed = Confirm::new()
                    .with_prompt(format!("Delete log entries older than {} days?", older_than_days))
                    .default(false)
                    .interact()?;
                if !confirmed {
                    println!("{}\n", "Cancelled".dimmed());
                    return Ok(());
                }
            }
            let cutoff = log_timestamp_now() - i64::from(older_than_days) * MS_PER_DAY;
            let deleted = log.delete_before(cutoff)?;
            if json {
                return output::print_json(&serde_json::json!({ "deleted": deleted }));
            }
            output::success(&format!("Deleted {} log entries", deleted));
        }
        LogsCommands::Stats { json } => {
            let total = log.count()?;
            let failures = log.count_errors()?;
            let size_bytes = std::fs::metadata(log.db_path()).map(|m| m.len()).unwrap_or(0);
            if json {
                return output::print_json(&serde_json::json!({
                    "totalEntries": total,
                    "errorCount": failures,
                    "databasePath": log.db_path().to_string_lossy(),
                    "databaseSizeBytes": size_bytes,
                }));
            }
            println!("{}", "Event log".bold());
            println!("  Entries:  {}", total);
            println!("  Failures: {}", failures);
            println!("  File:     {} ({} bytes)", log.db_path().display(), size_bytes);
        }
    }

    Ok(())
}
