//! bankrec CLI - bank statement reconciliation in your terminal

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use bankrec_core::{RecordKind, RecordStatus};
use commands::{
    accounts, doctor, get_logger, import, logs, new, pending, reconcile, records, suggest, summary,
};

/// bankrec - match bank statements against receivables and payables
#[derive(Parser)]
#[command(name = "bankrec", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List bank accounts with running balances
    Accounts {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create accounts and records
    New {
        #[command(subcommand)]
        command: new::NewCommands,
    },

    /// List receivables and payables (open ones by default)
    Records {
        /// Only this kind (receivable or payable)
        #[arg(long)]
        kind: Option<RecordKind>,
        /// Only this status (open, paid, cancelled)
        #[arg(long)]
        status: Option<RecordStatus>,
        /// Include paid and cancelled records
        #[arg(long, conflicts_with = "status")]
        all: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Import an OFX statement file
    Import {
        /// Path to the statement file
        file: PathBuf,
        /// Account to import into
        #[arg(long)]
        account_id: String,
        /// Show what would be imported without writing
        #[arg(long)]
        preview: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List statement imports
    Imports {
        /// Only imports for this account
        #[arg(long)]
        account_id: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List pending bank transactions
    Pending {
        /// Only transactions for this account
        #[arg(long)]
        account_id: Option<String>,
        /// Posted on or after (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,
        /// Posted on or before (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Suggest open records for a pending transaction
    Suggest {
        /// Bank transaction ID
        transaction_id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Settle a record with a pending transaction
    Reconcile {
        /// Bank transaction ID
        transaction_id: String,
        /// receivable or payable
        kind: RecordKind,
        /// Record ID
        record_id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Mark a pending transaction as ignored
    Ignore {
        /// Bank transaction ID
        transaction_id: String,
        /// Why the transaction needs no record
        #[arg(long, short)]
        reason: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Reconcile every exact-amount match on an account
    Auto {
        /// Account to process
        #[arg(long)]
        account_id: String,
        /// Show the planned pairs without applying them
        #[arg(long)]
        dry_run: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show reconciliation progress
    Summary {
        /// Only this account
        #[arg(long)]
        account_id: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run ledger health checks
    Doctor {
        /// Show the rows behind each failing check
        #[arg(long, short)]
        verbose: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// View and manage application logs
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

impl Commands {
    /// Name recorded in the command log
    fn name(&self) -> &'static str {
        match self {
            Commands::Accounts { .. } => "accounts",
            Commands::New { .. } => "new",
            Commands::Records { .. } => "records",
            Commands::Import { .. } => "import",
            Commands::Imports { .. } => "imports",
            Commands::Pending { .. } => "pending",
            Commands::Suggest { .. } => "suggest",
            Commands::Reconcile { .. } => "reconcile",
            Commands::Ignore { .. } => "ignore",
            Commands::Auto { .. } => "auto",
            Commands::Summary { .. } => "summary",
            Commands::Doctor { .. } => "doctor",
            Commands::Logs { .. } => "logs",
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(logger) = get_logger() {
        let _ = logger.log_command(cli.command.name());
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Accounts { json } => accounts::run(json),
        Commands::New { command } => new::run(command),
        Commands::Records {
            kind,
            status,
            all,
            json,
        } => records::run(kind, status, all, json),
        Commands::Import {
            file,
            account_id,
            preview,
            json,
        } => import::run(file, &account_id, preview, json),
        Commands::Imports { account_id, json } => import::list(account_id, json),
        Commands::Pending {
            account_id,
            from,
            to,
            json,
        } => pending::run(account_id, from, to, json),
        Commands::Suggest {
            transaction_id,
            json,
        } => suggest::run(&transaction_id, json),
        Commands::Reconcile {
            transaction_id,
            kind,
            record_id,
            json,
        } => reconcile::run(&transaction_id, kind, &record_id, json),
        Commands::Ignore {
            transaction_id,
            reason,
            json,
        } => reconcile::run_ignore(&transaction_id, reason, json),
        Commands::Auto {
            account_id,
            dry_run,
            json,
        } => reconcile::run_auto(&account_id, dry_run, json),
        Commands::Summary { account_id, json } => summary::run(account_id, json),
        Commands::Doctor { verbose, json } => doctor::run(verbose, json),
        Commands::Logs { command } => logs::run(command),
    }
}
