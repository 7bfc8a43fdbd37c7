//! Financial record (receivable / payable) domain model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which side of the books a record sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Receivable,
    Payable,
}

impl RecordKind {
    /// Credits settle receivables, debits settle payables, zero settles nothing
    pub fn for_amount(amount: Decimal) -> Option<Self> {
        if amount > Decimal::ZERO {
            Some(RecordKind::Receivable)
        } else if amount < Decimal::ZERO {
            Some(RecordKind::Payable)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Receivable => "receivable",
            RecordKind::Payable => "payable",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "receivable" | "receivables" | "ar" => Ok(RecordKind::Receivable),
            "payable" | "payables" | "ap" => Ok(RecordKind::Payable),
            other => Err(format!("unknown record kind '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Open,
    Paid,
    Cancelled,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Open => "open",
            RecordStatus::Paid => "paid",
            RecordStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(RecordStatus::Open),
            "paid" => Ok(RecordStatus::Paid),
            "cancelled" | "canceled" => Ok(RecordStatus::Cancelled),
            other => Err(format!("unknown record status '{}'", other)),
        }
    }
}

/// An open receivable or payable owned by the surrounding system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialRecord {
    pub id: Uuid,
    pub kind: RecordKind,
    pub description: String,
    /// Customer for receivables, supplier for payables
    pub counterparty: Option<String>,
    pub amount: Decimal,
    pub due_date: Option<NaiveDate>,
    pub status: RecordStatus,
    pub paid_amount: Option<Decimal>,
    pub paid_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl FinancialRecord {
    pub fn new(kind: RecordKind, amount: Decimal, due_date: Option<NaiveDate>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            description: String::new(),
            counterparty: None,
            amount,
            due_date,
            status: RecordStatus::Open,
            paid_amount: None,
            paid_date: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == RecordStatus::Open
    }

    /// Settle the record
    pub fn mark_paid(&mut self, date: NaiveDate, amount: Decimal) {
        self.status = RecordStatus::Paid;
        self.paid_date = Some(date);
        self.paid_amount = Some(amount);
    }

    /// Validate record data
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.amount <= Decimal::ZERO {
            return Err("record amount must be positive");
        }
        Ok(())
    }
}
