//! bankrec core - bank statement import and reconciliation
//!
//! The crate follows a hexagonal layout:
//!
//! - **domain**: accounts, bank transactions, financial records, parsed statements
//! - **adapters**: the OFX statement parser and the DuckDB ledger repository
//! - **services**: import, matching, reconciliation, status and health checks
//!
//! [`BankrecContext`] wires everything together from a data directory.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod services;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use adapters::duckdb::DuckDbRepository;
use config::Config;
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::{error_code, Error, OperationResult};
pub use domain::{
    AccountOverview, BankAccount, BankTransaction, FinancialRecord, ParsedStatement,
    PendingFilter, Polarity, RecordKind, RecordStatus, StatementImport, TransactionStatus,
};
pub use services::{EntryPoint, LogEvent, LoggingService};

/// Ledger database file inside the data directory
pub const DB_FILENAME: &str = "bankrec.duckdb";

/// Main context for reconciliation operations
///
/// Holds the repository, the configuration and every service. Services share the
/// repository, so one context means one connection to the ledger.
pub struct BankrecContext {
    pub config: Config,
    pub data_dir: PathBuf,
    pub repository: Arc<DuckDbRepository>,
    pub account_service: AccountService,
    pub record_service: RecordService,
    pub import_service: ImportService,
    pub match_service: MatchService,
    pub reconcile_service: ReconcileService,
    pub status_service: StatusService,
    pub doctor_service: DoctorService,
}

impl BankrecContext {
    /// Open the ledger in `data_dir`, creating the directory and schema when missing
    pub fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir).with_context(|| {
            format!("Failed to create data directory {}", data_dir.display())
        })?;
        let config = Config::load(data_dir).context("Failed to load settings.json")?;

        let db_path = data_dir.join(DB_FILENAME);
        let repository = Arc::new(
            DuckDbRepository::new(&db_path)
                .with_context(|| format!("Failed to open {}", db_path.display()))?,
        );
        repository.ensure_schema()?;

        let matching = config.matching.clone();
        Ok(Self {
            account_service: AccountService::new(Arc::clone(&repository)),
            record_service: RecordService::new(Arc::clone(&repository)),
            import_service: ImportService::new(Arc::clone(&repository)),
            match_service: MatchService::new(Arc::clone(&repository), matching.clone()),
            reconcile_service: ReconcileService::new(Arc::clone(&repository), matching),
            status_service: StatusService::new(Arc::clone(&repository)),
            doctor_service: DoctorService::new(Arc::clone(&repository)),
            config,
            data_dir: data_dir.to_path_buf(),
            repository,
        })
    }

    /// User recorded on imports and reconciliations
    pub fn acting_user(&self) -> String {
        self.config.acting_user()
    }
}
