//! Migration service - manages database schema migrations
//!
//! Migrations are SQL files embedded at compile time. Each applied migration is
//! recorded in `sys_migrations`, so running the service twice is a no-op.
//! The same runner serves the ledger (`bankrec.duckdb`) and the event log
//! (`logs.duckdb`); only the migration list differs.

use anyhow::{Context, Result};
use duckdb::Connection;

use crate::migrations::MIGRATIONS;

/// Name of the bootstrap migration that creates `sys_migrations`
const BOOTSTRAP: &str = "000_migrations.sql";

/// Result of running migrations
#[derive(Debug)]
pub struct MigrationResult {
    /// Names of newly applied migrations
    pub applied: Vec<String>,
    /// Count of migrations that were already applied
    pub already_applied: usize,
}

/// Service for managing database migrations
pub struct MigrationService<'a> {
    conn: &'a Connection,
    migrations: &'static [(&'static str, &'static str)],
}

impl<'a> MigrationService<'a> {
    /// Migration service over the ledger schema
    pub fn new(conn: &'a Connection) -> Self {
        Self::with_migrations(conn, MIGRATIONS)
    }

    /// Migration service over an arbitrary embedded migration list
    pub fn with_migrations(
        conn: &'a Connection,
        migrations: &'static [(&'static str, &'static str)],
    ) -> Self {
        Self { conn, migrations }
    }

    /// Run all pending migrations in order
    ///
    /// The bootstrap migration runs first when `sys_migrations` is missing.
    pub fn run_pending(&self) -> Result<MigrationResult> {
        let mut newly_applied = Vec::new();

        if !self.migrations_table_exists()? {
            if let Some((name, sql)) = self.migrations.iter().find(|(n, _)| *n == BOOTSTRAP) {
                self.apply(name, sql)?;
                newly_applied.push(name.to_string());
            }
        }

        let applied_set = self.get_applied()?;
        let already_applied = applied_set.len() - newly_applied.len();

        for (name, sql) in self.migrations.iter() {
            if *name == BOOTSTRAP || applied_set.iter().any(|a| a.as_str() == *name) {
                continue;
            }
            self.apply(name, sql)?;
            newly_applied.push(name.to_string());
        }

        Ok(MigrationResult {
            applied: newly_applied,
            already_applied,
        })
    }

    fn migrations_table_exists(&self) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = 'sys_migrations'",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Get list of already applied migration names
    pub fn get_applied(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT migration_name FROM sys_migrations ORDER BY migration_name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(names)
    }

    /// Get list of pending migration names
    pub fn get_pending(&self) -> Result<Vec<String>> {
        let applied = if self.migrations_table_exists()? {
            self.get_applied()?
        } else {
            Vec::new()
        };
        Ok(self
            .migrations
            .iter()
            .filter(|(name, _)| !applied.iter().any(|a| a.as_str() == *name))
            .map(|(name, _)| name.to_string())
            .collect())
    }

    fn apply(&self, name: &str, sql: &str) -> Result<()> {
        self.conn
            .execute_batch(sql)
            .with_context(|| format!("Failed to apply migration {}", name))?;
        self.conn.execute(
            "INSERT INTO sys_migrations (migration_name) VALUES (?)",
            [name],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_migrations::LOG_MIGRATIONS;

    #[test]
    fn test_migrations_run_on_fresh_db() {
        let conn = Connection::open_in_memory().unwrap();
        let service = MigrationService::new(&conn);

        let result = service.run_pending().unwrap();
        assert_eq!(result.applied.len(), MIGRATIONS.len());
        assert_eq!(result.already_applied, 0);

        // Running again should apply nothing
        let result2 = service.run_pending().unwrap();
        assert_eq!(result2.applied.len(), 0);
        assert_eq!(result2.already_applied, MIGRATIONS.len());
    }

    #[test]
    fn test_ledger_tables_exist_after_migration() {
        let conn = Connection::open_in_memory().unwrap();
        MigrationService::new(&conn).run_pending().unwrap();

        for table in [
            "bank_accounts",
            "statement_imports",
            "bank_transactions",
            "financial_records",
        ] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = ?",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "missing table {}", table);
        }
    }

    #[test]
    fn test_get_pending_on_fresh_db() {
        let conn = Connection::open_in_memory().unwrap();
        let service = MigrationService::new(&conn);
        assert_eq!(service.get_pending().unwrap().len(), MIGRATIONS.len());

        service.run_pending().unwrap();
        assert!(service.get_pending().unwrap().is_empty());
    }

    #[test]
    fn test_log_migrations_use_same_runner() {
        let conn = Connection::open_in_memory().unwrap();
        let service = MigrationService::with_migrations(&conn, LOG_MIGRATIONS);
        let result = service.run_pending().unwrap();
        assert_eq!(result.applied.len(), LOG_MIGRATIONS.len());

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM sys_logs", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
