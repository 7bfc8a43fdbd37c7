//! Bank account domain model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A bank account whose statements are imported and reconciled
///
/// `current_balance` moves only through reconciliation; it always equals
/// `initial_balance` plus the signed sum of the account's reconciled transactions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankAccount {
    pub id: Uuid,
    /// Bank code (BANKID in statements)
    pub bank_code: String,
    pub branch: String,
    pub account_number: String,
    /// Freeform, e.g. "checking", "savings"
    pub account_type: String,
    pub description: String,
    pub initial_balance: Decimal,
    pub current_balance: Decimal,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BankAccount {
    /// Create a new account with required fields
    pub fn new(
        bank_code: impl Into<String>,
        account_number: impl Into<String>,
        initial_balance: Decimal,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            bank_code: bank_code.into(),
            branch: String::new(),
            account_number: account_number.into(),
            account_type: "checking".to_string(),
            description: String::new(),
            initial_balance,
            current_balance: initial_balance,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Short human label: "bank/branch/number"
    pub fn label(&self) -> String {
        if self.branch.is_empty() {
            format!("{}/{}", self.bank_code, self.account_number)
        } else {
            format!("{}/{}/{}", self.bank_code, self.branch, self.account_number)
        }
    }

    /// Validate account data
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.bank_code.trim().is_empty() {
            return Err("bank code cannot be empty");
        }
        if self.account_number.trim().is_empty() {
            return Err("account number cannot be empty");
        }
        Ok(())
    }
}

/// An account together with the balance its reconciled transactions imply
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountOverview {
    #[serde(flatten)]
    pub account: BankAccount,
    /// `initial_balance` plus the signed sum of reconciled transactions
    pub computed_balance: Decimal,
    pub pending_count: i64,
}

impl AccountOverview {
    /// True when the stored running balance agrees with the ledger
    pub fn is_consistent(&self) -> bool {
        self.account.current_balance == self.computed_balance
    }
}
