//! CLI command implementations

pub mod accounts;
pub mod doctor;
pub mod import;
pub mod logs;
pub mod new;
pub mod pending;
pub mod reconcile;
pub mod records;
pub mod suggest;
pub mod summary;

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use bankrec_core::{BankrecContext, EntryPoint, LogEvent, LoggingService};

/// Environment variable that overrides the data directory
pub const DIR_ENV: &str = "BANKREC_DIR";

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let data_dir = get_data_dir().ok()?;
    std::fs::create_dir_all(&data_dir).ok()?;
    LoggingService::new(&data_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Data directory from `BANKREC_DIR`, or `~/.bankrec`
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".bankrec"))
        .ok_or_else(|| anyhow!("Could not find home directory; set {}", DIR_ENV))
}

/// Open the ledger in the data directory
pub fn get_context() -> Result<BankrecContext> {
    let data_dir = get_data_dir()?;
    BankrecContext::new(&data_dir).context("Failed to initialize bankrec context")
}

pub fn parse_id(raw: &str, what: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| anyhow!("Invalid {} id: {}", what, raw))
}

pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| anyhow!("Invalid date '{}'. Use YYYY-MM-DD", raw))
}

pub fn parse_amount(raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw.trim()).map_err(|_| anyhow!("Invalid amount: {}", raw))
}
