//! Statement import record

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One row per ingested statement file. Never updated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementImport {
    pub id: Uuid,
    pub account_id: Uuid,
    pub filename: String,
    pub bank_code: String,
    pub period_start: Option<NaiveDateTime>,
    pub period_end: Option<NaiveDateTime>,
    /// Lines found in the file, duplicates included
    pub transaction_count: i64,
    /// Closing balance as reported by the bank
    pub closing_balance: Decimal,
    pub balance_as_of: Option<NaiveDateTime>,
    /// Truncated SHA-256 of the raw file bytes
    pub file_digest: String,
    pub imported_by: String,
    pub imported_at: DateTime<Utc>,
}
