//! Logging service - structured event logging to DuckDB
//!
//! Events go to `logs.duckdb`, a database separate from the ledger. Only event
//! names, the command that ran and error text are stored. Amounts, descriptions,
//! counterparties and account numbers never reach the log.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Result};
use chrono::Utc;
use duckdb::Connection;
use serde::{Deserialize, Serialize};

use crate::log_migrations::LOG_MIGRATIONS;
use crate::services::MigrationService;

/// Event names recorded by the engine
pub mod events {
    pub const IMPORT_COMPLETED: &str = "import_completed";
    pub const IMPORT_FAILED: &str = "import_failed";
    pub const RECONCILE_COMPLETED: &str = "reconcile_completed";
    pub const RECONCILE_FAILED: &str = "reconcile_failed";
    pub const IGNORE_COMPLETED: &str = "ignore_completed";
    pub const IGNORE_FAILED: &str = "ignore_failed";
    pub const AUTO_RECONCILE_COMPLETED: &str = "auto_reconcile_completed";
    pub const COMMAND_EXECUTED: &str = "command_executed";
}

/// Counter for generating unique IDs within the same millisecond
static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Millisecond timestamp in the high bits, a wrapping counter in the low 16
fn generate_id() -> u64 {
    let timestamp = now_ms().max(0) as u64;
    let counter = ID_COUNTER.fetch_add(1, Ordering::Relaxed) & 0xFFFF;
    (timestamp << 16) | counter
}

/// Current unix timestamp in milliseconds
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn detect_platform() -> &'static str {
    if cfg!(target_os = "macos") {
        "macos"
    } else if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "linux") {
        "linux"
    } else {
        "unknown"
    }
}

/// Which front end produced an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryPoint {
    Cli,
    /// The core crate embedded in another program
    Library,
}

impl EntryPoint {
    fn as_str(&self) -> &'static str {
        match self {
            EntryPoint::Cli => "cli",
            EntryPoint::Library => "library",
        }
    }
}

/// A log event to be recorded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
}

impl LogEvent {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            command: None,
            error_message: None,
            error_details: None,
        }
    }

    /// Set the command context (for CLI events)
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn with_error_details(mut self, details: impl Into<String>) -> Self {
        self.error_details = Some(details.into());
        self
    }
}

/// A log entry as stored in the database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    pub timestamp: i64,
    pub entry_point: String,
    pub app_version: String,
    pub platform: String,
    pub event: String,
    pub command: Option<String>,
    pub error_message: Option<String>,
    pub error_details: Option<String>,
}

/// Number of entries recorded for one event name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventCount {
    pub event: String,
    pub count: u64,
}

const ENTRY_COLUMNS: &str = "id, timestamp, entry_point, app_version, platform,
     event, command, error_message, error_details";

/// Service for structured event logging
pub struct LoggingService {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    entry_point: EntryPoint,
    app_version: String,
    platform: &'static str,
}

impl LoggingService {
    /// Open or create `logs.duckdb` in the data directory and run pending migrations
    pub fn new(
        data_dir: &Path,
        entry_point: EntryPoint,
        app_version: impl Into<String>,
    ) -> Result<Self> {
        let db_path = data_dir.join("logs.duckdb");
        let conn = Connection::open(&db_path)?;
        MigrationService::with_migrations(&conn, LOG_MIGRATIONS).run_pending()?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
            entry_point,
            app_version: app_version.into(),
            platform: detect_platform(),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))
    }

    /// Record an event; entry point, version and platform come from the service
    pub fn log(&self, event: LogEvent) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sys_logs (id, timestamp, entry_point, app_version, platform,
                                   event, command, error_message, error_details)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            duckdb::params![
                generate_id(),
                now_ms(),
                self.entry_point.as_str(),
                &self.app_version,
                self.platform,
                &event.event,
                &event.command,
                &event.error_message,
                &event.error_details,
            ],
        )?;
        Ok(())
    }

    pub fn log_event(&self, event: &str) -> Result<()> {
        self.log(LogEvent::new(event))
    }

    /// Log a CLI command execution
    pub fn log_command(&self, command: &str) -> Result<()> {
        self.log(LogEvent::new(events::COMMAND_EXECUTED).with_command(command))
    }

    pub fn log_error(&self, event: &str, message: &str, details: Option<&str>) -> Result<()> {
        let mut log_event = LogEvent::new(event).with_error(message);
        if let Some(d) = details {
            log_event = log_event.with_error_details(d);
        }
        self.log(log_event)
    }

    /// Most recent entries, newest first
    pub fn get_recent(&self, limit: usize) -> Result<Vec<LogEntry>> {
        self.query_entries(
            &format!(
                "SELECT {} FROM sys_logs ORDER BY timestamp DESC, id DESC LIMIT ?",
                ENTRY_COLUMNS
            ),
            limit,
        )
    }

    /// Most recent entries that carry an error message
    pub fn get_errors(&self, limit: usize) -> Result<Vec<LogEntry>> {
        self.query_entries(
            &format!(
                "SELECT {} FROM sys_logs WHERE error_message IS NOT NULL
                 ORDER BY timestamp DESC, id DESC LIMIT ?",
                ENTRY_COLUMNS
            ),
            limit,
        )
    }

    fn query_entries(&self, sql: &str, limit: usize) -> Result<Vec<LogEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let entries = stmt
            .query_map([limit as i64], |row| {
                Ok(LogEntry {
                    id: row.get(0)?,
                    timestamp: row.get(1)?,
                    entry_point: row.get(2)?,
                    app_version: row.get(3)?,
                    platform: row.get(4)?,
                    event: row.get(5)?,
                    command: row.get(6)?,
                    error_message: row.get(7)?,
                    error_details: row.get(8)?,
                })
            })?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(entries)
    }

    /// Entry counts grouped by event name, most frequent first
    pub fn event_counts(&self) -> Result<Vec<EventCount>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT event, COUNT(*) FROM sys_logs GROUP BY event ORDER BY COUNT(*) DESC, event",
        )?;
        let counts = stmt
            .query_map([], |row| {
                Ok(EventCount {
                    event: row.get(0)?,
                    count: row.get::<_, i64>(1)?.max(0) as u64,
                })
            })?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(counts)
    }

    /// Total number of log entries
    pub fn count(&self) -> Result<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM sys_logs", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    /// Delete logs older than the given unix-ms timestamp
    pub fn delete_before(&self, timestamp_ms: i64) -> Result<u64> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM sys_logs WHERE timestamp < ?", [timestamp_ms])?;
        Ok(deleted as u64)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}
