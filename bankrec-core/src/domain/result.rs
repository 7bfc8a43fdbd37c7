//! Result and error types for the core library

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::record::{RecordKind, RecordStatus};
use super::transaction::TransactionStatus;

/// Core library error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("No transactions found in statement")]
    EmptyStatement,

    #[error("Account not found: {0}")]
    AccountNotFound(Uuid),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(Uuid),

    #[error("{kind} not found: {id}")]
    RecordNotFound { kind: RecordKind, id: Uuid },

    #[error("{kind} {id} is {status}, expected open")]
    RecordNotOpen {
        kind: RecordKind,
        id: Uuid,
        status: RecordStatus,
    },

    #[error("Transaction {id} already {status}")]
    AlreadyProcessed { id: Uuid, status: TransactionStatus },

    #[error("Database error: {0}")]
    Persistence(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a persistence error
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True for the errors that mean "the row exists but was already handled"
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::AlreadyProcessed { .. } | Self::RecordNotOpen { .. })
    }
}

impl From<duckdb::Error> for Error {
    fn from(err: duckdb::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// Operation result with optional context (for JSON output)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub context: Option<HashMap<String, serde_json::Value>>,
}

impl<T> OperationResult<T> {
    /// Create a successful result
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            context: None,
        }
    }

    /// Create a failed result
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            context: None,
        }
    }

    /// Attach a context entry
    pub fn with_context(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.context
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value);
        self
    }
}

impl<T> From<Result<T>> for OperationResult<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => {
                let code = error_code(&e);
                Self::fail(e.to_string()).with_context("code", serde_json::Value::from(code))
            }
        }
    }
}

/// Stable machine-readable code for an error
pub fn error_code(err: &Error) -> &'static str {
    match err {
        Error::EmptyStatement => "empty_statement",
        Error::AccountNotFound(_) => "account_not_found",
        Error::TransactionNotFound(_) => "transaction_not_found",
        Error::RecordNotFound { .. } => "record_not_found",
        Error::RecordNotOpen { .. } => "record_not_open",
        Error::AlreadyProcessed { .. } => "already_processed",
        Error::Persistence(_) => "persistence_failure",
        Error::Validation(_) => "validation",
        Error::Config(_) => "config",
        Error::Io(_) => "io",
    }
}
