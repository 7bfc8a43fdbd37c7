//! Parsed statement model
//!
//! Every attribute the bank may omit is an `Option`. Defaults are applied once,
//! when the statement is persisted, never while parsing.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BankIdentity {
    pub code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountIdentity {
    pub branch: Option<String>,
    pub number: Option<String>,
    pub account_type: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementPeriod {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClosingBalance {
    pub amount: Option<Decimal>,
    pub as_of: Option<NaiveDateTime>,
}

/// One STMTTRN block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementLine {
    pub trn_type: Option<String>,
    pub posted_at: Option<NaiveDateTime>,
    pub amount: Option<Decimal>,
    pub bank_ref: Option<String>,
    pub memo: Option<String>,
    pub name: Option<String>,
    pub check_number: Option<String>,
}

impl StatementLine {
    /// MEMO when present, otherwise NAME
    pub fn description(&self) -> Option<&str> {
        self.memo.as_deref().or(self.name.as_deref())
    }

    /// Amount with the zero default applied
    pub fn amount_or_zero(&self) -> Decimal {
        self.amount.unwrap_or(Decimal::ZERO)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedStatement {
    pub bank: BankIdentity,
    pub account: AccountIdentity,
    pub period: StatementPeriod,
    pub balance: ClosingBalance,
    pub transactions: Vec<StatementLine>,
}

impl ParsedStatement {
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}
