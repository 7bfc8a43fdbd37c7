//! Logs command - view and manage application logs

use anyhow::Result;
use chrono::{Duration, TimeZone, Utc};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;

use super::get_data_dir;
use crate::output::{create_table, format_size};
use bankrec_core::services::logging::now_ms;
use bankrec_core::{EntryPoint, LoggingService};

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
    /// Clear old log entries
    Clear {
        /// Delete logs older than N days
        #[arg(long, default_value = "30")]
        older_than_days: i64,
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show log statistics and database path
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn get_logging_service() -> Result<LoggingService> {
    let data_dir = get_data_dir()?;
    std::fs::create_dir_all(&data_dir)?;
    LoggingService::new(&data_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION"))
}

fn format_timestamp(timestamp_ms: i64) -> String {
    Utc.timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp_ms.to_string())
}

pub fn run(command: LogsCommands) -> Result<()> {
    let service = get_logging_service()?;

    match command {
        LogsCommands::List {
            limit,
            errors,
            json,
        } => {
            let entries = if errors {
                service.get_errors(limit)?
            } else {
                service.get_recent(limit)?
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
                return Ok(());
            }

            if entries.is_empty() {
                println!("No log entries found.");
                return Ok(());
            }

            let mut table = create_table();
            table.set_header(vec!["Time", "Entry", "Event", "Command", "Error"]);
            for entry in &entries {
                table.add_row(vec![
                    format_timestamp(entry.timestamp),
                    entry.entry_point.clone(),
                    entry.event.clone(),
                    entry.command.clone().unwrap_or_default(),
                    entry.error_message.clone().unwrap_or_default(),
                ]);
            }
            println!("{}", table);

            if !errors {
                let recent_errors = service.get_errors(3)?;
                if !recent_errors.is_empty() {
                    println!();
                    println!("{}", "Recent Errors:".red().bold());
                    for err in &recent_errors {
                        println!(
                            "  {} [{}]: {}",
                            format_timestamp(err.timestamp).dimmed(),
                            err.event,
                            err.error_details
                                .as_deref()
                                .or(err.error_message.as_deref())
                                .unwrap_or("Unknown error")
                        );
                    }
                }
            }
        }
        LogsCommands::Clear {
            older_than_days,
            force,
            json,
        } => {
            let cutoff_ms = now_ms() - Duration::days(older_than_days).num_milliseconds();

            if !force
                && !json
                && !Confirm::new()
                    .with_prompt(format!("Delete logs older than {} days?", older_than_days))
                    .default(false)
                    .interact()?
            {
                println!("Cancelled.");
                return Ok(());
            }

            let deleted = service.delete_before(cutoff_ms)?;

            if json {
                println!("{}", serde_json::json!({ "deleted": deleted }));
            } else {
                println!("Deleted {} log entries", deleted);
            }
        }
        LogsCommands::Stats { json } => {
            let total = service.count()?;
            let by_event = service.event_counts()?;
            let db_path = service.db_path().to_path_buf();
            let size_bytes = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "total_entries": total,
                        "events": by_event,
                        "database_path": db_path.to_string_lossy(),
                        "database_size_bytes": size_bytes
                    }))?
                );
            } else {
                println!("{}", "Log Statistics".bold());
                println!("  Total entries: {}", total);
                println!("  Database: {}", db_path.display());
                println!("  Size: {}", format_size(size_bytes));
                if !by_event.is_empty() {
                    println!();
                    for count in &by_event {
                        println!("  {:<28} {}", count.event, count.count);
                    }
                }
            }
        }
    }

    Ok(())
}
