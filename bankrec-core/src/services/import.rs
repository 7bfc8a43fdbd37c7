//! Import service - statement file ingestion
//!
//! Parses a statement, records the import, and inserts each line unless the account
//! already holds a transaction with the same FITID. Dedup is enforced by the storage
//! constraint, so two concurrent imports of one file still insert each line once.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use chrono::{NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::adapters::duckdb::DuckDbRepository;
use crate::adapters::ofx;
use crate::domain::result::{Error, Result};
use crate::domain::statement::{ClosingBalance, StatementLine, StatementPeriod};
use crate::domain::{BankTransaction, ParsedStatement, StatementImport};

/// Filename recorded when a statement arrives as text rather than from a file
const INLINE_SOURCE: &str = "inline";

/// Import service for statement files
pub struct ImportService {
    repository: Arc<DuckDbRepository>,
}

impl ImportService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    /// Import already-decoded statement text
    ///
    /// The digest covers the Latin-1 bytes of the text, so it matches the digest of the
    /// file the text was decoded from.
    pub fn import(&self, account_id: Uuid, raw_text: &str, user: &str) -> Result<ImportResult> {
        self.ingest(
            account_id,
            INLINE_SOURCE,
            raw_text,
            file_digest(&ofx::encode_latin1(raw_text)),
            user,
            false,
        )
    }

    /// Import a statement file from disk
    ///
    /// The file is decoded as Latin-1. With `preview` set nothing is written and the
    /// result lists every line with its duplicate verdict.
    pub fn import_file(
        &self,
        account_id: Uuid,
        path: &Path,
        user: &str,
        preview: bool,
    ) -> Result<ImportResult> {
        let bytes = std::fs::read(path)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.import_bytes(account_id, &filename, &bytes, user, preview)
    }

    /// Import raw file bytes under the given filename
    pub fn import_bytes(
        &self,
        account_id: Uuid,
        filename: &str,
        bytes: &[u8],
        user: &str,
        preview: bool,
    ) -> Result<ImportResult> {
        let text = ofx::decode_latin1(bytes);
        self.ingest(account_id, filename, &text, file_digest(bytes), user, preview)
    }

    /// Imports recorded so far, newest first
    pub fn list_imports(&self, account_id: Option<Uuid>) -> Result<Vec<StatementImport>> {
        self.repository.list_imports(account_id)
    }

    fn ingest(
        &self,
        account_id: Uuid,
        filename: &str,
        raw_text: &str,
        digest: String,
        user: &str,
        preview: bool,
    ) -> Result<ImportResult> {
        if !self.repository.account_exists(account_id)? {
            return Err(Error::AccountNotFound(account_id));
        }

        let parsed = ofx::parse(raw_text);
        if parsed.is_empty() {
            return Err(Error::EmptyStatement);
        }

        if preview {
            return self.preview(account_id, &parsed);
        }

        let import = StatementImport {
            id: Uuid::new_v4(),
            account_id,
            filename: filename.to_string(),
            bank_code: parsed.bank.code.clone().unwrap_or_default(),
            period_start: parsed.period.start,
            period_end: parsed.period.end,
            transaction_count: parsed.transactions.len() as i64,
            closing_balance: parsed.balance.amount.unwrap_or(Decimal::ZERO),
            balance_as_of: parsed.balance.as_of,
            file_digest: digest,
            imported_by: user.to_string(),
            imported_at: Utc::now(),
        };
        self.repository.insert_import(&import)?;

        let mut inserted = 0i64;
        let mut duplicates = 0i64;
        for line in &parsed.transactions {
            let tx = to_transaction(account_id, import.id, line);
            if self.repository.insert_bank_transaction_if_absent(&tx)? {
                inserted += 1;
            } else {
                duplicates += 1;
            }
        }

        Ok(ImportResult {
            import_id: Some(import.id),
            account_id,
            total_in_file: import.transaction_count,
            inserted,
            duplicates,
            period: parsed.period,
            balance: parsed.balance,
            preview: false,
            lines: None,
        })
    }

    /// Classify lines the way a real import would, without writing
    fn preview(&self, account_id: Uuid, parsed: &ParsedStatement) -> Result<ImportResult> {
        let mut seen = HashSet::new();
        let mut lines = Vec::with_capacity(parsed.transactions.len());

        for line in &parsed.transactions {
            let bank_ref = BankTransaction::normalize_bank_ref(line.bank_ref.as_deref());
            let duplicate = match &bank_ref {
                Some(r) => !seen.insert(r.clone()) || self.repository.bank_ref_exists(account_id, r)?,
                None => false,
            };
            lines.push(LinePreview {
                posted_at: line.posted_at,
                amount: line.amount_or_zero(),
                bank_ref,
                description: line.description().unwrap_or_default().to_string(),
                duplicate,
            });
        }

        let duplicates = lines.iter().filter(|l| l.duplicate).count() as i64;
        Ok(ImportResult {
            import_id: None,
            account_id,
            total_in_file: lines.len() as i64,
            inserted: lines.len() as i64 - duplicates,
            duplicates,
            period: parsed.period,
            balance: parsed.balance,
            preview: true,
            lines: Some(lines),
        })
    }
}

/// Apply the import-boundary defaults to one parsed line
fn to_transaction(account_id: Uuid, import_id: Uuid, line: &StatementLine) -> BankTransaction {
    let mut tx = BankTransaction::new(account_id, line.amount_or_zero(), line.posted_at);
    tx.import_id = Some(import_id);
    tx.bank_ref = BankTransaction::normalize_bank_ref(line.bank_ref.as_deref());
    tx.trn_type = line.trn_type.clone().unwrap_or_default();
    tx.description = line.description().unwrap_or_default().to_string();
    tx.document = line.check_number.clone().unwrap_or_default();
    tx
}

/// First 16 hex characters of the SHA-256 of the raw file
fn file_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let result = hasher.finalize();
    result[..8].iter().map(|b| format!("{:02x}", b)).collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportResult {
    /// `None` in preview mode
    pub import_id: Option<Uuid>,
    pub account_id: Uuid,
    /// Lines found in the file
    pub total_in_file: i64,
    /// Lines stored as new pending transactions (would be stored, in preview mode)
    pub inserted: i64,
    /// Lines whose FITID the account already held
    pub duplicates: i64,
    pub period: StatementPeriod,
    pub balance: ClosingBalance,
    pub preview: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines: Option<Vec<LinePreview>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinePreview {
    pub posted_at: Option<NaiveDateTime>,
    pub amount: Decimal,
    pub bank_ref: Option<String>,
    pub description: String,
    pub duplicate: bool,
}
