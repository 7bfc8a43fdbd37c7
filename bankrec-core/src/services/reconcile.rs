//! Reconcile service - atomic state transitions for bank transactions
//!
//! A reconciliation touches three rows: the financial record (paid), the bank
//! transaction (reconciled) and the account (balance). All three change inside one
//! unit of work or none do.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::adapters::duckdb::DuckDbRepository;
use crate::config::MatchingSettings;
use crate::domain::result::{error_code, Error, Result};
use crate::domain::{
    BankTransaction, FinancialRecord, PendingFilter, RecordKind, RecordStatus,
};

/// Observation stored when a transaction is ignored without a reason
pub const DEFAULT_IGNORE_REASON: &str = "Ignored by user";

#[derive(Debug, Clone, Serialize)]
pub struct ReconcileOutcome {
    pub transaction_id: Uuid,
    pub account_id: Uuid,
    pub record_kind: RecordKind,
    pub record_id: Uuid,
    /// Signed amount applied to the account balance
    pub amount: Decimal,
    pub paid_date: NaiveDate,
    pub processed_by: String,
    pub processed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IgnoreOutcome {
    pub transaction_id: Uuid,
    pub reason: String,
    pub processed_by: String,
    pub processed_at: DateTime<Utc>,
}

/// Which auto-reconcile pass produced a pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPass {
    /// Same amount, due date equal to the posting date
    ExactDate,
    /// Same amount, due date within the configured window
    NearDate,
}

/// A transaction/record pair chosen by auto-reconcile
#[derive(Debug, Clone, Serialize)]
pub struct AutoMatch {
    pub transaction_id: Uuid,
    pub record_kind: RecordKind,
    pub record_id: Uuid,
    pub amount: Decimal,
    pub pass: MatchPass,
    pub day_distance: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AutoFailure {
    pub transaction_id: Uuid,
    pub record_id: Uuid,
    pub code: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AutoReconcileResult {
    pub account_id: Uuid,
    pub dry_run: bool,
    /// Pending transactions considered
    pub examined: usize,
    pub matches: Vec<AutoMatch>,
    /// Pairs committed (always 0 on a dry run)
    pub reconciled: usize,
    pub failures: Vec<AutoFailure>,
}

/// Pair pending transactions with open records of equal amount
///
/// Pass 1 wants the due date on the posting date; pass 2 accepts up to
/// `max_days` apart and takes the nearest. Within a pass the lowest record id wins.
/// Each record and each transaction is used at most once. Transactions without a
/// posting date or with a zero amount are never paired.
pub fn plan_matches(
    pending: &[BankTransaction],
    open_records: &[FinancialRecord],
    max_days: i64,
) -> Vec<AutoMatch> {
    let mut claimed_records: HashSet<Uuid> = HashSet::new();
    let mut claimed_txs: HashSet<Uuid> = HashSet::new();
    let mut matches = Vec::new();

    for (pass, window) in [(MatchPass::ExactDate, 0), (MatchPass::NearDate, max_days)] {
        for tx in pending {
            if claimed_txs.contains(&tx.id) {
                continue;
            }
            let (Some(kind), Some(posted)) = (tx.settles(), tx.posted_at) else {
                continue;
            };
            let posted = posted.date();
            let abs_amount = tx.abs_amount();

            let best = open_records
                .iter()
                .filter(|r| {
                    r.kind == kind
                        && r.status == RecordStatus::Open
                        && r.amount == abs_amount
                        && !claimed_records.contains(&r.id)
                })
                .filter_map(|r| {
                    let distance = (r.due_date? - posted).num_days().abs();
                    (distance <= window).then_some((distance, r))
                })
                .min_by_key(|(distance, r)| (*distance, r.id));

            if let Some((distance, record)) = best {
                claimed_records.insert(record.id);
                claimed_txs.insert(tx.id);
                matches.push(AutoMatch {
                    transaction_id: tx.id,
                    record_kind: kind,
                    record_id: record.id,
                    amount: tx.amount,
                    pass,
                    day_distance: distance,
                });
            }
        }
    }

    matches
}

/// Reconcile service for matching, ignoring and auto-matching transactions
pub struct ReconcileService {
    repository: Arc<DuckDbRepository>,
    settings: MatchingSettings,
}

impl ReconcileService {
    pub fn new(repository: Arc<DuckDbRepository>, settings: MatchingSettings) -> Self {
        Self {
            repository,
            settings,
        }
    }

    /// Settle `record_id` with a pending bank transaction
    ///
    /// The record kind is not checked against the transaction's polarity, so a
    /// caller can deliberately pair a credit with a payable. `paid_date` is the
    /// posting date, or today when the statement carried none.
    pub fn reconcile(
        &self,
        transaction_id: Uuid,
        record_kind: RecordKind,
        record_id: Uuid,
        user: &str,
    ) -> Result<ReconcileOutcome> {
        self.repository.in_transaction(|ledger| {
            let tx = ledger.pending_transaction(transaction_id)?;
            let now = Utc::now();
            let paid_date = tx
                .posted_at
                .map(|dt| dt.date())
                .unwrap_or_else(|| now.date_naive());

            ledger.mark_record_paid(record_kind, record_id, paid_date, tx.abs_amount())?;
            ledger.mark_reconciled(transaction_id, record_kind, record_id, user, now)?;
            ledger.apply_balance_delta(tx.account_id, tx.amount)?;

            Ok(ReconcileOutcome {
                transaction_id,
                account_id: tx.account_id,
                record_kind,
                record_id,
                amount: tx.amount,
                paid_date,
                processed_by: user.to_string(),
                processed_at: now,
            })
        })
    }

    /// Mark a pending transaction as ignored; no other row changes
    pub fn ignore(&self, transaction_id: Uuid, reason: &str, user: &str) -> Result<IgnoreOutcome> {
        let reason = match reason.trim() {
            "" => DEFAULT_IGNORE_REASON,
            r => r,
        };
        self.repository.in_transaction(|ledger| {
            ledger.pending_transaction(transaction_id)?;
            let now = Utc::now();
            ledger.mark_ignored(transaction_id, reason, user, now)?;
            Ok(IgnoreOutcome {
                transaction_id,
                reason: reason.to_string(),
                processed_by: user.to_string(),
                processed_at: now,
            })
        })
    }

    /// Pair and reconcile every unambiguous equal-amount match on one account
    ///
    /// Each pair commits on its own; a pair that fails (for instance because another
    /// caller reconciled the transaction first) is reported and the run goes on.
    pub fn auto_reconcile(
        &self,
        account_id: Uuid,
        user: &str,
        dry_run: bool,
    ) -> Result<AutoReconcileResult> {
        if !self.repository.account_exists(account_id)? {
            return Err(Error::AccountNotFound(account_id));
        }

        let pending = self
            .repository
            .list_pending(&PendingFilter::for_account(account_id))?;
        let open_records = self.repository.list_records(None, Some(RecordStatus::Open))?;
        let matches = plan_matches(&pending, &open_records, self.settings.auto_match_days);

        let mut reconciled = 0;
        let mut failures = Vec::new();
        if !dry_run {
            for m in &matches {
                match self.reconcile(m.transaction_id, m.record_kind, m.record_id, user) {
                    Ok(_) => reconciled += 1,
                    Err(e) => failures.push(AutoFailure {
                        transaction_id: m.transaction_id,
                        record_id: m.record_id,
                        code: error_code(&e).to_string(),
                        error: e.to_string(),
                    }),
                }
            }
        }

        Ok(AutoReconcileResult {
            account_id,
            dry_run,
            examined: pending.len(),
            matches,
            reconciled,
            failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, d).unwrap()
    }

    fn pending(cents: i64, day: Option<u32>) -> BankTransaction {
        let posted = day.map(|d| date(d).and_hms_opt(9, 0, 0).unwrap());
        BankTransaction::new(Uuid::new_v4(), Decimal::new(cents, 2), posted)
    }

    fn open(kind: RecordKind, cents: i64, day: u32) -> FinancialRecord {
        FinancialRecord::new(kind, Decimal::new(cents, 2), Some(date(day)))
    }

    #[test]
    fn test_exact_date_pass_runs_before_near_date_pass() {
        // tx_a could take the same-day record in pass 2, but tx_b claims it in pass 1
        let tx_a = pending(10000, Some(8));
        let tx_b = pending(10000, Some(10));
        let same_day_as_b = open(RecordKind::Receivable, 10000, 10);
        let near_a = open(RecordKind::Receivable, 10000, 6);

        let matches = plan_matches(
            &[tx_a.clone(), tx_b.clone()],
            &[same_day_as_b.clone(), near_a.clone()],
            3,
        );

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].transaction_id, tx_b.id);
        assert_eq!(matches[0].record_id, same_day_as_b.id);
        assert_eq!(matches[0].pass, MatchPass::ExactDate);
        assert_eq!(matches[1].transaction_id, tx_a.id);
        assert_eq!(matches[1].record_id, near_a.id);
        assert_eq!(matches[1].pass, MatchPass::NearDate);
        assert_eq!(matches[1].day_distance, 2);
    }

    #[test]
    fn test_records_are_claimed_once() {
        let first = pending(-5000, Some(8));
        let second = pending(-5000, Some(8));
        let record = open(RecordKind::Payable, 5000, 8);

        let matches = plan_matches(&[first.clone(), second], &[record], 3);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].transaction_id, first.id);
        assert_eq!(matches[0].record_kind, RecordKind::Payable);
    }

    #[test]
    fn test_no_match_outside_window_or_kind_or_amount() {
        let tx = pending(10000, Some(8));
        let records = [
            open(RecordKind::Receivable, 10000, 12),
            open(RecordKind::Payable, 10000, 8),
            open(RecordKind::Receivable, 10001, 8),
        ];
        assert!(plan_matches(&[tx], &records, 3).is_empty());
    }

    #[test]
    fn test_undated_and_zero_transactions_are_skipped() {
        let undated = pending(10000, None);
        let zero = pending(0, Some(8));
        let record = open(RecordKind::Receivable, 10000, 8);
        assert!(plan_matches(&[undated, zero], &[record], 3).is_empty());
    }

    #[test]
    fn test_nearest_date_wins_in_second_pass() {
        let tx = pending(10000, Some(8));
        let far = open(RecordKind::Receivable, 10000, 11);
        let near = open(RecordKind::Receivable, 10000, 7);

        let matches = plan_matches(&[tx], &[far, near.clone()], 3);
        assert_eq!(matches[0].record_id, near.id);
        assert_eq!(matches[0].day_distance, 1);
    }
}
