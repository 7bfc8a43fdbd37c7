//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod account;
mod import;
mod record;
pub mod result;
pub mod statement;
mod transaction;

pub use account::{AccountOverview, BankAccount};
pub use import::StatementImport;
pub use record::{FinancialRecord, RecordKind, RecordStatus};
pub use statement::{ParsedStatement, StatementLine};
pub use transaction::{BankTransaction, PendingFilter, Polarity, TransactionStatus};
