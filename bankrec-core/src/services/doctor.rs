//! Doctor service - ledger health checks
//!
//! Verifies the invariants reconciliation is supposed to keep: running balances match
//! reconciled transactions, every reconciled transaction points at a paid record, and
//! no transaction belongs to a missing account.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::result::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Warning,
    Error,
}

#[derive(Debug, Serialize)]
pub struct CheckResult {
    pub status: CheckStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<serde_json::Value>>,
}

impl CheckResult {
    fn pass(message: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Pass,
            message: message.into(),
            details: None,
        }
    }

    fn failing(
        status: CheckStatus,
        message: impl Into<String>,
        details: Vec<serde_json::Value>,
    ) -> Self {
        Self {
            status,
            message: message.into(),
            details: Some(details),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DoctorResult {
    pub checks: BTreeMap<String, CheckResult>,
    pub summary: DoctorSummary,
}

impl DoctorResult {
    pub fn is_healthy(&self) -> bool {
        self.summary.errors == 0
    }
}

#[derive(Debug, Serialize)]
pub struct DoctorSummary {
    pub passed: i64,
    pub warnings: i64,
    pub errors: i64,
}

/// Doctor service for health checks
pub struct DoctorService {
    repository: Arc<DuckDbRepository>,
}

impl DoctorService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    /// Run all health checks
    pub fn run_checks(&self) -> Result<DoctorResult> {
        let mut checks = BTreeMap::new();

        // Running balance vs initial balance + reconciled sum
        let drifted: Vec<serde_json::Value> = self
            .repository
            .list_account_overviews()?
            .into_iter()
            .filter(|o| !o.is_consistent())
            .map(|o| {
                json!({
                    "account_id": o.account.id,
                    "account": o.account.label(),
                    "current_balance": o.account.current_balance,
                    "expected_balance": o.computed_balance,
                })
            })
            .collect();
        checks.insert(
            "balance_invariant".to_string(),
            if drifted.is_empty() {
                CheckResult::pass("Every running balance matches its reconciled transactions")
            } else {
                CheckResult::failing(
                    CheckStatus::Error,
                    format!("{} account(s) have a drifted running balance", drifted.len()),
                    drifted,
                )
            },
        );

        let dangling = self.repository.check_dangling_matches()?;
        let dangling_details: Vec<serde_json::Value> = dangling
            .iter()
            .map(|(tx_id, record_id, status)| {
                json!({
                    "transaction_id": tx_id,
                    "record_id": record_id,
                    "record_status": status.as_deref().unwrap_or("missing"),
                })
            })
            .collect();
        checks.insert(
            "reconciled_matches".to_string(),
            if dangling.is_empty() {
                CheckResult::pass("Every reconciled transaction points at a paid record")
            } else {
                CheckResult::failing(
                    CheckStatus::Error,
                    format!(
                        "{} reconciled transaction(s) point at a missing or unpaid record",
                        dangling.len()
                    ),
                    dangling_details,
                )
            },
        );

        let orphans = self.repository.check_orphaned_transactions()?;
        let orphan_details: Vec<serde_json::Value> = orphans
            .iter()
            .map(|(tx_id, account_id)| {
                json!({
                    "transaction_id": tx_id,
                    "account_id": account_id,
                })
            })
            .collect();
        checks.insert(
            "orphaned_transactions".to_string(),
            if orphans.is_empty() {
                CheckResult::pass("No orphaned transactions found")
            } else {
                CheckResult::failing(
                    CheckStatus::Error,
                    format!("{} transaction(s) reference missing accounts", orphans.len()),
                    orphan_details,
                )
            },
        );

        let pending = self.repository.summary(None)?.pending;
        checks.insert(
            "pending_backlog".to_string(),
            if pending == 0 {
                CheckResult::pass("No pending transactions")
            } else {
                CheckResult::failing(
                    CheckStatus::Warning,
                    format!("{} transaction(s) still pending", pending),
                    vec![json!({ "pending": pending })],
                )
            },
        );

        let count = |status| checks.values().filter(|c| c.status == status).count() as i64;
        let summary = DoctorSummary {
            passed: count(CheckStatus::Pass),
            warnings: count(CheckStatus::Warning),
            errors: count(CheckStatus::Error),
        };

        Ok(DoctorResult { checks, summary })
    }
}
