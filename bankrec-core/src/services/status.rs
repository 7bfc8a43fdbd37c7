//! Status service - pending listings and reconciliation summaries

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::result::Result;
use crate::domain::{BankTransaction, PendingFilter};

/// Transaction counts by status plus pending totals
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciliationSummary {
    /// `None` when the summary spans every account
    pub account_id: Option<Uuid>,
    pub total: i64,
    pub pending: i64,
    pub reconciled: i64,
    pub ignored: i64,
    /// Sum of pending credits
    pub pending_credits: Decimal,
    /// Sum of pending debits, as a positive number
    pub pending_debits: Decimal,
}

/// Status service for pending work and summaries
pub struct StatusService {
    repository: Arc<DuckDbRepository>,
}

impl StatusService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    /// Pending transactions, oldest first
    pub fn list_pending(&self, filter: &PendingFilter) -> Result<Vec<BankTransaction>> {
        self.repository.list_pending(filter)
    }

    pub fn summary(&self, account_id: Option<Uuid>) -> Result<ReconciliationSummary> {
        self.repository.summary(account_id)
    }
}
