//! Bank transaction domain model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::record::RecordKind;

/// Reconciliation status of a statement line
///
/// `Reconciled` and `Ignored` are terminal: nothing moves a transaction out of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Reconciled,
    Ignored,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Reconciled => "reconciled",
            TransactionStatus::Ignored => "ignored",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(TransactionStatus::Pending),
            "reconciled" => Ok(TransactionStatus::Reconciled),
            "ignored" => Ok(TransactionStatus::Ignored),
            other => Err(format!("unknown transaction status '{}'", other)),
        }
    }
}

/// Direction of money movement, derived from the sign of the amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Credit,
    Debit,
}

impl Polarity {
    /// Negative amounts are debits; zero and positive amounts are credits
    pub fn from_amount(amount: Decimal) -> Self {
        if amount < Decimal::ZERO {
            Polarity::Debit
        } else {
            Polarity::Credit
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Polarity::Credit => "credit",
            Polarity::Debit => "debit",
        }
    }
}

impl FromStr for Polarity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "credit" => Ok(Polarity::Credit),
            "debit" => Ok(Polarity::Debit),
            other => Err(format!("unknown polarity '{}'", other)),
        }
    }
}

/// A single statement line belonging to a bank account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankTransaction {
    pub id: Uuid,
    pub account_id: Uuid,
    /// Import batch this line arrived in
    pub import_id: Option<Uuid>,
    pub polarity: Polarity,
    /// Signed amount exactly as carried in the statement
    pub amount: Decimal,
    pub posted_at: Option<NaiveDateTime>,
    /// Bank-assigned FITID; `None` when the statement omitted it
    pub bank_ref: Option<String>,
    /// Raw TRNTYPE value
    pub trn_type: String,
    pub description: String,
    pub document: String,
    pub status: TransactionStatus,
    pub matched_kind: Option<RecordKind>,
    pub matched_id: Option<Uuid>,
    pub processed_by: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    /// Reason recorded when the line was ignored
    pub observation: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl BankTransaction {
    /// Create a new pending transaction
    pub fn new(account_id: Uuid, amount: Decimal, posted_at: Option<NaiveDateTime>) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            import_id: None,
            polarity: Polarity::from_amount(amount),
            amount,
            posted_at,
            bank_ref: None,
            trn_type: String::new(),
            description: String::new(),
            document: String::new(),
            status: TransactionStatus::Pending,
            matched_kind: None,
            matched_id: None,
            processed_by: None,
            processed_at: None,
            observation: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == TransactionStatus::Pending
    }

    /// Absolute value of the amount
    pub fn abs_amount(&self) -> Decimal {
        self.amount.abs()
    }

    /// Kind of financial record this transaction can settle, `None` for zero amounts
    pub fn settles(&self) -> Option<RecordKind> {
        RecordKind::for_amount(self.amount)
    }

    /// Normalize the bank reference: blank references are treated as absent
    pub fn normalize_bank_ref(bank_ref: Option<&str>) -> Option<String> {
        bank_ref
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

/// Filters for listing pending transactions
///
/// Date bounds are inclusive and compare against the posting date; transactions
/// without a posting date are left out whenever a bound is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct PendingFilter {
    pub account_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl PendingFilter {
    pub fn for_account(account_id: Uuid) -> Self {
        Self {
            account_id: Some(account_id),
            ..Default::default()
        }
    }
}
