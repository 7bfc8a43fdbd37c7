//! Match service - ranks open records against a pending bank transaction
//!
//! Credits look at receivables and debits at payables, inside a symmetric amount
//! window around the transaction's absolute value. Read-only.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::adapters::duckdb::DuckDbRepository;
use crate::config::MatchingSettings;
use crate::domain::result::{Error, Result};
use crate::domain::{BankTransaction, FinancialRecord, RecordKind};

/// One candidate with its score
#[derive(Debug, Clone, Serialize)]
pub struct RankedCandidate {
    pub record: FinancialRecord,
    /// 100 for an exact amount, falling linearly with relative distance
    pub similarity: Decimal,
    /// Days between the record's due date and the posting date, when both are known
    pub day_distance: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Suggestion {
    pub transaction: BankTransaction,
    /// Kind searched; `None` for zero-amount transactions
    pub record_kind: Option<RecordKind>,
    pub candidates: Vec<RankedCandidate>,
}

/// Inclusive amount window `[abs × (1 − p), abs × (1 + p)]` for a tolerance of `p` percent
pub fn amount_window(abs_amount: Decimal, tolerance_percent: Decimal) -> (Decimal, Decimal) {
    let factor = tolerance_percent / Decimal::ONE_HUNDRED;
    (
        abs_amount * (Decimal::ONE - factor),
        abs_amount * (Decimal::ONE + factor),
    )
}

/// `100 − |candidate − abs| / abs × 100`, clamped to `[0, 100]`, 4 decimal places
pub fn similarity(abs_amount: Decimal, candidate: Decimal) -> Decimal {
    if abs_amount.is_zero() {
        return Decimal::ZERO;
    }
    let score =
        Decimal::ONE_HUNDRED - (candidate - abs_amount).abs() / abs_amount * Decimal::ONE_HUNDRED;
    score
        .clamp(Decimal::ZERO, Decimal::ONE_HUNDRED)
        .round_dp(4)
}

fn day_distance(record: &FinancialRecord, posted_at: Option<NaiveDateTime>) -> Option<i64> {
    let due = record.due_date?;
    let posted = posted_at?.date();
    Some((due - posted).num_days().abs())
}

/// Score and order candidates for a transaction
///
/// Highest similarity first. Ties go to the nearest due date (unknown dates last),
/// then the smaller amount, then the record id.
pub fn rank(tx: &BankTransaction, records: Vec<FinancialRecord>) -> Vec<RankedCandidate> {
    let abs_amount = tx.abs_amount();
    let mut ranked: Vec<RankedCandidate> = records
        .into_iter()
        .map(|record| RankedCandidate {
            similarity: similarity(abs_amount, record.amount),
            day_distance: day_distance(&record, tx.posted_at),
            record,
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.similarity
            .cmp(&a.similarity)
            .then_with(|| match (a.day_distance, b.day_distance) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
            .then_with(|| a.record.amount.cmp(&b.record.amount))
            .then_with(|| a.record.id.cmp(&b.record.id))
    });
    ranked
}

/// Match service for reconciliation suggestions
pub struct MatchService {
    repository: Arc<DuckDbRepository>,
    settings: MatchingSettings,
}

impl MatchService {
    pub fn new(repository: Arc<DuckDbRepository>, settings: MatchingSettings) -> Self {
        Self {
            repository,
            settings,
        }
    }

    /// Ranked candidates for one transaction
    ///
    /// Zero-amount and already processed transactions get an empty list.
    pub fn suggest(&self, transaction_id: Uuid) -> Result<Suggestion> {
        let tx = self
            .repository
            .get_bank_transaction(transaction_id)?
            .ok_or(Error::TransactionNotFound(transaction_id))?;

        let record_kind = tx.settles();
        let candidates = match record_kind {
            Some(kind) if tx.is_pending() => {
                let abs_amount = tx.abs_amount();
                let (low, high) = amount_window(abs_amount, self.settings.tolerance_percent);
                let records = self.repository.find_candidates(
                    kind,
                    low,
                    high,
                    abs_amount,
                    self.settings.max_candidates,
                )?;
                rank(&tx, records)
            }
            _ => Vec::new(),
        };

        Ok(Suggestion {
            transaction: tx,
            record_kind,
            candidates,
        })
    }
}
