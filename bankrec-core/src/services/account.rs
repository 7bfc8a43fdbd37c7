//! Account service - bank account registration and listing

use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::result::{Error, Result};
use crate::domain::{AccountOverview, BankAccount};

/// Fields for a new account; blank optional fields fall back to defaults
#[derive(Debug, Clone, Default)]
pub struct NewAccount {
    pub bank_code: String,
    pub branch: String,
    pub account_number: String,
    pub account_type: Option<String>,
    pub description: String,
    pub initial_balance: Decimal,
}

pub struct AccountService {
    repository: Arc<DuckDbRepository>,
}

impl AccountService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    /// Register an account; its running balance starts at the initial balance
    pub fn create(&self, input: NewAccount) -> Result<BankAccount> {
        let mut account = BankAccount::new(
            input.bank_code.trim(),
            input.account_number.trim(),
            input.initial_balance,
        );
        account.branch = input.branch.trim().to_string();
        account.description = input.description.trim().to_string();
        if let Some(kind) = input.account_type.filter(|t| !t.trim().is_empty()) {
            account.account_type = kind.trim().to_lowercase();
        }
        account.validate().map_err(Error::validation)?;

        self.repository.insert_account(&account)?;
        Ok(account)
    }

    pub fn get(&self, id: Uuid) -> Result<BankAccount> {
        self.repository
            .get_account(id)?
            .ok_or(Error::AccountNotFound(id))
    }

    /// All accounts with the balance implied by their reconciled transactions
    pub fn list(&self) -> Result<Vec<AccountOverview>> {
        self.repository.list_account_overviews()
    }
}
