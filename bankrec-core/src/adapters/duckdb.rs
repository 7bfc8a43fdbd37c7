//! DuckDB repository implementation
//!
//! The single storage adapter. Every SQL statement the engine issues lives here.
//! Money columns are `DECIMAL(18,2)`; values are bound as strings and read back
//! through `::VARCHAR` so no amount ever passes through a float.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use duckdb::{params, params_from_iter, Connection, Row};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{
    AccountOverview, BankAccount, BankTransaction, FinancialRecord, PendingFilter, RecordKind,
    RecordStatus, StatementImport, TransactionStatus,
};
use crate::services::{MigrationResult, MigrationService, ReconciliationSummary};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
        || lower.contains("could not set lock")
}

const ACCOUNT_COLUMNS: &str = "a.account_id, a.bank_code, a.branch, a.account_number, a.account_type,
     a.description, a.initial_balance::VARCHAR, a.current_balance::VARCHAR, a.active,
     a.created_at::VARCHAR, a.updated_at::VARCHAR";

const TRANSACTION_COLUMNS: &str = "transaction_id, account_id, import_id, polarity, amount::VARCHAR,
     posted_at::VARCHAR, fitid, trn_type, description, document, status, matched_kind,
     matched_id, processed_by, processed_at::VARCHAR, observation, created_at::VARCHAR";

const RECORD_COLUMNS: &str = "record_id, kind, description, counterparty, amount::VARCHAR,
     due_date::VARCHAR, status, paid_amount::VARCHAR, paid_date::VARCHAR, created_at::VARCHAR";

const IMPORT_COLUMNS: &str = "import_id, account_id, filename, bank_code, period_start::VARCHAR,
     period_end::VARCHAR, transaction_count, closing_balance::VARCHAR, balance_as_of::VARCHAR,
     file_digest, imported_by, imported_at::VARCHAR";

/// DuckDB repository implementation
///
/// One connection behind a mutex: every read and every unit of work is serialized,
/// which is what makes the status re-check inside [`DuckDbRepository::in_transaction`]
/// race-free.
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl DuckDbRepository {
    /// Open (or create) the ledger database
    ///
    /// Includes retry logic with exponential backoff for file locking errors,
    /// which happen when another process still holds the database file.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: db_path.to_path_buf(),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        eprintln!(
                            "[bankrec] Database busy, retrying in {}ms (attempt {}/{}): {}",
                            delay.as_millis(),
                            attempt + 1,
                            MAX_RETRIES,
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }

        Err(last_error.map(Error::from).unwrap_or_else(|| {
            Error::persistence(format!(
                "Failed to open database after {} retries",
                MAX_RETRIES
            ))
        }))
    }

    fn try_open_connection(db_path: &Path) -> duckdb::Result<Connection> {
        // Extension autoloading stays off: nothing here needs more than the bundled core
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Connection::open_with_flags(db_path, config)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::persistence(format!("Lock poisoned: {}", e)))
    }

    /// Run database migrations using the MigrationService
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.conn()?;
        MigrationService::new(&conn)
            .run_pending()
            .map_err(|e| Error::persistence(format!("Migration failed: {:#}", e)))
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    /// Run `f` as one unit of work
    ///
    /// Commits when `f` returns `Ok`. Any error drops the DuckDB transaction, which
    /// rolls back every statement `f` issued.
    pub fn in_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&LedgerTx<'_>) -> Result<T>,
    {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let value = f(&LedgerTx { conn: &tx })?;
        tx.commit()?;
        Ok(value)
    }

    // === Account operations ===

    pub fn insert_account(&self, account: &BankAccount) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO bank_accounts (account_id, bank_code, branch, account_number, account_type,
                                        description, initial_balance, current_balance, active,
                                        created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                account.id.to_string(),
                account.bank_code,
                account.branch,
                account.account_number,
                account.account_type,
                account.description,
                account.initial_balance.to_string(),
                account.current_balance.to_string(),
                account.active,
                format_timestamp(&account.created_at),
                format_timestamp(&account.updated_at),
            ],
        )?;
        Ok(())
    }

    pub fn get_account(&self, id: Uuid) -> Result<Option<BankAccount>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM bank_accounts a WHERE a.account_id = ?",
            ACCOUNT_COLUMNS
        );
        Ok(query_rows(&conn, &sql, [id.to_string()], row_to_account)?
            .into_iter()
            .next())
    }

    pub fn account_exists(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM bank_accounts WHERE account_id = ?",
            [id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Every account with the balance its reconciled transactions imply
    pub fn list_account_overviews(&self) -> Result<Vec<AccountOverview>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {},
                    (a.initial_balance + COALESCE((SELECT SUM(t.amount) FROM bank_transactions t
                      WHERE t.account_id = a.account_id AND t.status = 'reconciled'), 0))::VARCHAR,
                    (SELECT COUNT(*) FROM bank_transactions t
                      WHERE t.account_id = a.account_id AND t.status = 'pending')
             FROM bank_accounts a
             ORDER BY a.bank_code, a.branch, a.account_number",
            ACCOUNT_COLUMNS
        );
        query_rows(&conn, &sql, [], |row| {
            Ok(AccountOverview {
                account: row_to_account(row)?,
                computed_balance: col_decimal(row, 11)?,
                pending_count: row.get(12)?,
            })
        })
    }

    // === Statement imports ===

    pub fn insert_import(&self, import: &StatementImport) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO statement_imports (import_id, account_id, filename, bank_code, period_start,
                                            period_end, transaction_count, closing_balance,
                                            balance_as_of, file_digest, imported_by, imported_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                import.id.to_string(),
                import.account_id.to_string(),
                import.filename,
                import.bank_code,
                import.period_start.as_ref().map(format_naive),
                import.period_end.as_ref().map(format_naive),
                import.transaction_count,
                import.closing_balance.to_string(),
                import.balance_as_of.as_ref().map(format_naive),
                import.file_digest,
                import.imported_by,
                format_timestamp(&import.imported_at),
            ],
        )?;
        Ok(())
    }

    /// Imports, newest first
    pub fn list_imports(&self, account_id: Option<Uuid>) -> Result<Vec<StatementImport>> {
        let conn = self.conn()?;
        let mut sql = format!("SELECT {} FROM statement_imports", IMPORT_COLUMNS);
        let mut values = Vec::new();
        if let Some(id) = account_id {
            sql.push_str(" WHERE account_id = ?");
            values.push(id.to_string());
        }
        sql.push_str(" ORDER BY imported_at DESC");
        query_rows(&conn, &sql, params_from_iter(values.iter()), row_to_import)
    }

    // === Bank transactions ===

    /// Insert a transaction unless its `(account_id, fitid)` is already stored
    ///
    /// Returns `false` when the insert was suppressed by the uniqueness constraint.
    /// Rows without a FITID always insert.
    pub fn insert_bank_transaction_if_absent(&self, tx: &BankTransaction) -> Result<bool> {
        let conn = self.conn()?;
        let rows_changed = conn.execute(
            "INSERT INTO bank_transactions (transaction_id, account_id, import_id, polarity, amount,
                                            posted_at, fitid, trn_type, description, document,
                                            status, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (account_id, fitid) DO NOTHING",
            params![
                tx.id.to_string(),
                tx.account_id.to_string(),
                tx.import_id.map(|id| id.to_string()),
                tx.polarity.as_str(),
                tx.amount.to_string(),
                tx.posted_at.as_ref().map(format_naive),
                tx.bank_ref,
                tx.trn_type,
                tx.description,
                tx.document,
                tx.status.as_str(),
                format_timestamp(&tx.created_at),
            ],
        )?;
        Ok(rows_changed > 0)
    }

    /// Check whether a FITID is already stored for the account
    pub fn bank_ref_exists(&self, account_id: Uuid, bank_ref: &str) -> Result<bool> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM bank_transactions WHERE account_id = ? AND fitid = ?",
            params![account_id.to_string(), bank_ref],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn get_bank_transaction(&self, id: Uuid) -> Result<Option<BankTransaction>> {
        let conn = self.conn()?;
        load_transaction(&conn, id)
    }

    pub fn count_bank_transactions(&self, account_id: Uuid) -> Result<i64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM bank_transactions WHERE account_id = ?",
            [account_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Pending transactions, oldest posting date first
    pub fn list_pending(&self, filter: &PendingFilter) -> Result<Vec<BankTransaction>> {
        let conn = self.conn()?;
        let mut sql = format!(
            "SELECT {} FROM bank_transactions WHERE status = 'pending'",
            TRANSACTION_COLUMNS
        );
        let mut values = Vec::new();
        if let Some(id) = filter.account_id {
            sql.push_str(" AND account_id = ?");
            values.push(id.to_string());
        }
        if let Some(from) = filter.from {
            sql.push_str(" AND CAST(posted_at AS DATE) >= CAST(? AS DATE)");
            values.push(from.to_string());
        }
        if let Some(to) = filter.to {
            sql.push_str(" AND CAST(posted_at AS DATE) <= CAST(? AS DATE)");
            values.push(to.to_string());
        }
        sql.push_str(" ORDER BY posted_at ASC NULLS LAST, created_at, transaction_id");
        query_rows(&conn, &sql, params_from_iter(values.iter()), row_to_transaction)
    }

    // === Financial records ===

    pub fn insert_record(&self, record: &FinancialRecord) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO financial_records (record_id, kind, description, counterparty, amount,
                                            due_date, status, paid_amount, paid_date, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                record.id.to_string(),
                record.kind.as_str(),
                record.description,
                record.counterparty,
                record.amount.to_string(),
                record.due_date.map(|d| d.to_string()),
                record.status.as_str(),
                record.paid_amount.map(|a| a.to_string()),
                record.paid_date.map(|d| d.to_string()),
                format_timestamp(&record.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn get_record(&self, kind: RecordKind, id: Uuid) -> Result<Option<FinancialRecord>> {
        let conn = self.conn()?;
        load_record(&conn, kind, id)
    }

    /// Records filtered by kind and status, earliest due date first
    pub fn list_records(
        &self,
        kind: Option<RecordKind>,
        status: Option<RecordStatus>,
    ) -> Result<Vec<FinancialRecord>> {
        let conn = self.conn()?;
        let mut sql = format!("SELECT {} FROM financial_records WHERE 1 = 1", RECORD_COLUMNS);
        let mut values = Vec::new();
        if let Some(kind) = kind {
            sql.push_str(" AND kind = ?");
            values.push(kind.as_str().to_string());
        }
        if let Some(status) = status {
            sql.push_str(" AND status = ?");
            values.push(status.as_str().to_string());
        }
        sql.push_str(" ORDER BY due_date ASC NULLS LAST, created_at, record_id");
        query_rows(&conn, &sql, params_from_iter(values.iter()), row_to_record)
    }

    /// Open records of `kind` whose amount lies in `[low, high]`, closest to `target` first
    pub fn find_candidates(
        &self,
        kind: RecordKind,
        low: Decimal,
        high: Decimal,
        target: Decimal,
        limit: usize,
    ) -> Result<Vec<FinancialRecord>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM financial_records
             WHERE kind = ? AND status = 'open'
               AND amount BETWEEN CAST(? AS DECIMAL(38,6)) AND CAST(? AS DECIMAL(38,6))
             ORDER BY ABS(amount - CAST(? AS DECIMAL(38,6))), record_id
             LIMIT ?",
            RECORD_COLUMNS
        );
        query_rows(
            &conn,
            &sql,
            params![
                kind.as_str(),
                low.round_dp(6).to_string(),
                high.round_dp(6).to_string(),
                target.round_dp(6).to_string(),
                limit as i64,
            ],
            row_to_record,
        )
    }

    // === Aggregates ===

    pub fn summary(&self, account_id: Option<Uuid>) -> Result<ReconciliationSummary> {
        let conn = self.conn()?;
        let mut sql = String::from(
            "SELECT COUNT(*),
                    COUNT(*) FILTER (WHERE status = 'pending'),
                    COUNT(*) FILTER (WHERE status = 'reconciled'),
                    COUNT(*) FILTER (WHERE status = 'ignored'),
                    COALESCE(SUM(amount) FILTER (WHERE status = 'pending' AND amount > 0), 0)::VARCHAR,
                    COALESCE(ABS(SUM(amount) FILTER (WHERE status = 'pending' AND amount < 0)), 0)::VARCHAR
             FROM bank_transactions",
        );
        let mut values = Vec::new();
        if let Some(id) = account_id {
            sql.push_str(" WHERE account_id = ?");
            values.push(id.to_string());
        }
        let mut rows = query_rows(&conn, &sql, params_from_iter(values.iter()), |row| {
            Ok(ReconciliationSummary {
                account_id,
                total: row.get(0)?,
                pending: row.get(1)?,
                reconciled: row.get(2)?,
                ignored: row.get(3)?,
                pending_credits: col_decimal(row, 4)?,
                pending_debits: col_decimal(row, 5)?,
            })
        })?;
        rows.pop()
            .ok_or_else(|| Error::persistence("summary query returned no rows"))
    }

    // === Doctor checks ===

    /// `(transaction_id, account_id)` of transactions whose account is gone
    pub fn check_orphaned_transactions(&self) -> Result<Vec<(String, String)>> {
        let conn = self.conn()?;
        query_rows(
            &conn,
            "SELECT t.transaction_id, t.account_id FROM bank_transactions t
             LEFT JOIN bank_accounts a ON t.account_id = a.account_id
             WHERE a.account_id IS NULL
             ORDER BY t.transaction_id",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
    }

    /// Reconciled transactions whose matched record is missing, of another kind, or not paid
    ///
    /// Returns `(transaction_id, matched_id, record_status)`; the status is `None`
    /// when no such record exists.
    pub fn check_dangling_matches(&self) -> Result<Vec<(String, Option<String>, Option<String>)>> {
        let conn = self.conn()?;
        query_rows(
            &conn,
            "SELECT t.transaction_id, t.matched_id, r.status FROM bank_transactions t
             LEFT JOIN financial_records r
                    ON r.record_id = t.matched_id AND r.kind = t.matched_kind
             WHERE t.status = 'reconciled'
               AND (r.record_id IS NULL OR r.status <> 'paid')
             ORDER BY t.transaction_id",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
    }

    pub fn get_db_size(&self) -> Result<u64> {
        Ok(std::fs::metadata(&self.db_path)?.len())
    }
}

/// Typed statements available inside a unit of work
///
/// Every status change is conditional on the state it expects, so a writer that lost
/// a race sees zero affected rows and fails instead of overwriting.
pub struct LedgerTx<'a> {
    conn: &'a Connection,
}

impl LedgerTx<'_> {
    /// Load a transaction that must still be pending
    pub fn pending_transaction(&self, id: Uuid) -> Result<BankTransaction> {
        let tx = load_transaction(self.conn, id)?.ok_or(Error::TransactionNotFound(id))?;
        if !tx.is_pending() {
            return Err(Error::AlreadyProcessed {
                id,
                status: tx.status,
            });
        }
        Ok(tx)
    }

    /// Settle an open record
    pub fn mark_record_paid(
        &self,
        kind: RecordKind,
        id: Uuid,
        paid_date: NaiveDate,
        paid_amount: Decimal,
    ) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE financial_records
             SET status = 'paid', paid_date = CAST(? AS DATE), paid_amount = CAST(? AS DECIMAL(18,2))
             WHERE record_id = ? AND kind = ? AND status = 'open'",
            params![
                paid_date.to_string(),
                paid_amount.to_string(),
                id.to_string(),
                kind.as_str(),
            ],
        )?;
        if rows == 0 {
            return Err(match load_record(self.conn, kind, id)? {
                Some(record) => Error::RecordNotOpen {
                    kind,
                    id,
                    status: record.status,
                },
                None => Error::RecordNotFound { kind, id },
            });
        }
        Ok(())
    }

    /// Move a pending transaction to `reconciled`
    pub fn mark_reconciled(
        &self,
        id: Uuid,
        kind: RecordKind,
        record_id: Uuid,
        user: &str,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE bank_transactions
             SET status = 'reconciled', matched_kind = ?, matched_id = ?,
                 processed_by = ?, processed_at = ?
             WHERE transaction_id = ? AND status = 'pending'",
            params![
                kind.as_str(),
                record_id.to_string(),
                user,
                format_timestamp(&at),
                id.to_string(),
            ],
        )?;
        self.expect_pending_update(id, rows)
    }

    /// Move a pending transaction to `ignored`
    pub fn mark_ignored(&self, id: Uuid, reason: &str, user: &str, at: DateTime<Utc>) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE bank_transactions
             SET status = 'ignored', observation = ?, processed_by = ?, processed_at = ?
             WHERE transaction_id = ? AND status = 'pending'",
            params![reason, user, format_timestamp(&at), id.to_string()],
        )?;
        self.expect_pending_update(id, rows)
    }

    /// Add `delta` to the account's running balance
    pub fn apply_balance_delta(&self, account_id: Uuid, delta: Decimal) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE bank_accounts
             SET current_balance = current_balance + CAST(? AS DECIMAL(18,2)), updated_at = ?
             WHERE account_id = ?",
            params![
                delta.to_string(),
                format_timestamp(&Utc::now()),
                account_id.to_string(),
            ],
        )?;
        if rows == 0 {
            return Err(Error::AccountNotFound(account_id));
        }
        Ok(())
    }

    fn expect_pending_update(&self, id: Uuid, rows: usize) -> Result<()> {
        if rows > 0 {
            return Ok(());
        }
        match load_transaction(self.conn, id)? {
            Some(tx) => Err(Error::AlreadyProcessed {
                id,
                status: tx.status,
            }),
            None => Err(Error::TransactionNotFound(id)),
        }
    }
}

// Shared queries (used with both the plain connection and a unit of work)

fn query_rows<T, P>(
    conn: &Connection,
    sql: &str,
    params: P,
    f: impl FnMut(&Row<'_>) -> duckdb::Result<T>,
) -> Result<Vec<T>>
where
    P: duckdb::Params,
{
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, f)?;
    Ok(rows.collect::<duckdb::Result<Vec<T>>>()?)
}

fn load_transaction(conn: &Connection, id: Uuid) -> Result<Option<BankTransaction>> {
    let sql = format!(
        "SELECT {} FROM bank_transactions WHERE transaction_id = ?",
        TRANSACTION_COLUMNS
    );
    Ok(query_rows(conn, &sql, [id.to_string()], row_to_transaction)?
        .into_iter()
        .next())
}

fn load_record(conn: &Connection, kind: RecordKind, id: Uuid) -> Result<Option<FinancialRecord>> {
    let sql = format!(
        "SELECT {} FROM financial_records WHERE record_id = ? AND kind = ?",
        RECORD_COLUMNS
    );
    Ok(
        query_rows(conn, &sql, params![id.to_string(), kind.as_str()], row_to_record)?
            .into_iter()
            .next(),
    )
}

// Row mappers. Column order follows the *_COLUMNS constants above.

fn row_to_account(row: &Row<'_>) -> duckdb::Result<BankAccount> {
    Ok(BankAccount {
        id: col_uuid(row, 0)?,
        bank_code: row.get(1)?,
        branch: row.get(2)?,
        account_number: row.get(3)?,
        account_type: row.get(4)?,
        description: row.get(5)?,
        initial_balance: col_decimal(row, 6)?,
        current_balance: col_decimal(row, 7)?,
        active: row.get(8)?,
        created_at: col_timestamp(row, 9)?,
        updated_at: col_timestamp(row, 10)?,
    })
}

fn row_to_transaction(row: &Row<'_>) -> duckdb::Result<BankTransaction> {
    Ok(BankTransaction {
        id: col_uuid(row, 0)?,
        account_id: col_uuid(row, 1)?,
        import_id: col_opt_uuid(row, 2)?,
        polarity: col_parse(row, 3)?,
        amount: col_decimal(row, 4)?,
        posted_at: col_opt_naive(row, 5)?,
        bank_ref: row.get(6)?,
        trn_type: row.get(7)?,
        description: row.get(8)?,
        document: row.get(9)?,
        status: col_parse::<TransactionStatus>(row, 10)?,
        matched_kind: col_opt_parse(row, 11)?,
        matched_id: col_opt_uuid(row, 12)?,
        processed_by: row.get(13)?,
        processed_at: col_opt_naive(row, 14)?.map(|dt| dt.and_utc()),
        observation: row.get(15)?,
        created_at: col_timestamp(row, 16)?,
    })
}

fn row_to_record(row: &Row<'_>) -> duckdb::Result<FinancialRecord> {
    Ok(FinancialRecord {
        id: col_uuid(row, 0)?,
        kind: col_parse(row, 1)?,
        description: row.get(2)?,
        counterparty: row.get(3)?,
        amount: col_decimal(row, 4)?,
        due_date: col_opt_date(row, 5)?,
        status: col_parse(row, 6)?,
        paid_amount: col_opt_decimal(row, 7)?,
        paid_date: col_opt_date(row, 8)?,
        created_at: col_timestamp(row, 9)?,
    })
}

fn row_to_import(row: &Row<'_>) -> duckdb::Result<StatementImport> {
    Ok(StatementImport {
        id: col_uuid(row, 0)?,
        account_id: col_uuid(row, 1)?,
        filename: row.get(2)?,
        bank_code: row.get(3)?,
        period_start: col_opt_naive(row, 4)?,
        period_end: col_opt_naive(row, 5)?,
        transaction_count: row.get(6)?,
        closing_balance: col_decimal(row, 7)?,
        balance_as_of: col_opt_naive(row, 8)?,
        file_digest: row.get(9)?,
        imported_by: row.get(10)?,
        imported_at: col_timestamp(row, 11)?,
    })
}

// Column helpers

fn conversion_error(
    idx: usize,
    err: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
) -> duckdb::Error {
    duckdb::Error::FromSqlConversionFailure(idx, duckdb::types::Type::Text, err.into())
}

fn col_uuid(row: &Row<'_>, idx: usize) -> duckdb::Result<Uuid> {
    let s: String = row.get(idx)?;
    Uuid::parse_str(&s).map_err(|e| conversion_error(idx, e))
}

fn col_opt_uuid(row: &Row<'_>, idx: usize) -> duckdb::Result<Option<Uuid>> {
    let s: Option<String> = row.get(idx)?;
    s.map(|s| Uuid::parse_str(&s).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn col_decimal(row: &Row<'_>, idx: usize) -> duckdb::Result<Decimal> {
    let s: String = row.get(idx)?;
    Decimal::from_str(&s).map_err(|e| conversion_error(idx, e))
}

fn col_opt_decimal(row: &Row<'_>, idx: usize) -> duckdb::Result<Option<Decimal>> {
    let s: Option<String> = row.get(idx)?;
    s.map(|s| Decimal::from_str(&s).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn col_parse<T: FromStr<Err = String>>(row: &Row<'_>, idx: usize) -> duckdb::Result<T> {
    let s: String = row.get(idx)?;
    s.parse().map_err(|e: String| conversion_error(idx, e))
}

fn col_opt_parse<T: FromStr<Err = String>>(row: &Row<'_>, idx: usize) -> duckdb::Result<Option<T>> {
    let s: Option<String> = row.get(idx)?;
    s.map(|s| s.parse().map_err(|e: String| conversion_error(idx, e)))
        .transpose()
}

fn col_opt_naive(row: &Row<'_>, idx: usize) -> duckdb::Result<Option<NaiveDateTime>> {
    let s: Option<String> = row.get(idx)?;
    s.map(|s| {
        parse_naive_datetime(&s)
            .ok_or_else(|| conversion_error(idx, format!("invalid timestamp '{}'", s)))
    })
    .transpose()
}

fn col_timestamp(row: &Row<'_>, idx: usize) -> duckdb::Result<DateTime<Utc>> {
    let s: String = row.get(idx)?;
    parse_naive_datetime(&s)
        .map(|dt| dt.and_utc())
        .ok_or_else(|| conversion_error(idx, format!("invalid timestamp '{}'", s)))
}

fn col_opt_date(row: &Row<'_>, idx: usize) -> duckdb::Result<Option<NaiveDate>> {
    let s: Option<String> = row.get(idx)?;
    s.map(|s| {
        NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .map_err(|e| conversion_error(idx, e))
    })
    .transpose()
}

// Helper functions

/// Timestamps are stored as naive UTC
fn format_timestamp(dt: &DateTime<Utc>) -> String {
    format_naive(&dt.naive_utc())
}

fn format_naive(dt: &NaiveDateTime) -> String {
    dt.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

/// Parse the textual forms DuckDB produces for TIMESTAMP columns
fn parse_naive_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
