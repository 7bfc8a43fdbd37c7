//! Record service - receivables and payables
//!
//! The engine only ever settles records; this service lets them be created and
//! listed so the ledger can be used on its own.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::result::{Error, Result};
use crate::domain::{FinancialRecord, RecordKind, RecordStatus};

#[derive(Debug, Clone)]
pub struct NewRecord {
    pub kind: RecordKind,
    pub amount: Decimal,
    pub due_date: Option<NaiveDate>,
    pub description: String,
    pub counterparty: Option<String>,
}

pub struct RecordService {
    repository: Arc<DuckDbRepository>,
}

impl RecordService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    /// Create an open record
    pub fn create(&self, input: NewRecord) -> Result<FinancialRecord> {
        let mut record = FinancialRecord::new(input.kind, input.amount, input.due_date);
        record.description = input.description.trim().to_string();
        record.counterparty = input
            .counterparty
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        record.validate().map_err(Error::validation)?;

        self.repository.insert_record(&record)?;
        Ok(record)
    }

    pub fn get(&self, kind: RecordKind, id: Uuid) -> Result<FinancialRecord> {
        self.repository
            .get_record(kind, id)?
            .ok_or(Error::RecordNotFound { kind, id })
    }

    /// Open records, optionally of one kind, earliest due date first
    pub fn list_open(&self, kind: Option<RecordKind>) -> Result<Vec<FinancialRecord>> {
        self.repository.list_records(kind, Some(RecordStatus::Open))
    }

    pub fn list(
        &self,
        kind: Option<RecordKind>,
        status: Option<RecordStatus>,
    ) -> Result<Vec<FinancialRecord>> {
        self.repository.list_records(kind, status)
    }
}
