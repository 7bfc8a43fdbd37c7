//! New command - register accounts and records

use anyhow::Result;
use clap::Subcommand;
use dialoguer::Input;
use rust_decimal::Decimal;

use super::{get_context, parse_amount, parse_date};
use crate::output::{emit, format_amount, success};
use bankrec_core::services::{NewAccount, NewRecord};
use bankrec_core::RecordKind;

#[derive(Subcommand)]
pub enum NewCommands {
    /// Register a bank account
    Account {
        /// Bank code (as in the statement's BANKID)
        #[arg(long)]
        bank: Option<String>,
        /// Branch number
        #[arg(long)]
        branch: Option<String>,
        /// Account number
        #[arg(long)]
        number: Option<String>,
        /// Account type (checking, savings, ...)
        #[arg(long = "type")]
        account_type: Option<String>,
        /// Free-form description
        #[arg(long)]
        description: Option<String>,
        /// Opening balance
        #[arg(long)]
        initial_balance: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add an open receivable or payable
    Record {
        /// receivable or payable
        kind: RecordKind,
        /// Expected amount (positive)
        #[arg(long)]
        amount: Option<String>,
        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Customer or supplier
        #[arg(long)]
        counterparty: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: NewCommands) -> Result<()> {
    match command {
        NewCommands::Account {
            bank,
            branch,
            number,
            account_type,
            description,
            initial_balance,
            json,
        } => run_account(
            bank,
            branch,
            number,
            account_type,
            description,
            initial_balance,
            json,
        ),
        NewCommands::Record {
            kind,
            amount,
            due,
            description,
            counterparty,
            json,
        } => run_record(kind, amount, due, description, counterparty, json),
    }
}

/// Use the flag when given, otherwise ask
fn prompt_if_missing(value: Option<String>, prompt: &str) -> Result<String> {
    match value {
        Some(v) => Ok(v),
        None => Ok(Input::new().with_prompt(prompt).interact_text()?),
    }
}

fn run_account(
    bank: Option<String>,
    branch: Option<String>,
    number: Option<String>,
    account_type: Option<String>,
    description: Option<String>,
    initial_balance: Option<String>,
    json: bool,
) -> Result<()> {
    let ctx = get_context()?;

    let bank_code = prompt_if_missing(bank, "Bank code")?;
    let account_number = prompt_if_missing(number, "Account number")?;
    let initial_balance = match initial_balance {
        Some(raw) => parse_amount(&raw)?,
        None => Decimal::ZERO,
    };

    let input = NewAccount {
        bank_code,
        branch: branch.unwrap_or_default(),
        account_number,
        account_type,
        description: description.unwrap_or_default(),
        initial_balance,
    };

    emit(json, ctx.account_service.create(input), |account| {
        success("Account created");
        println!("  ID: {}", account.id);
        println!("  Account: {}", account.label());
        println!("  Type: {}", account.account_type);
        println!("  Balance: {}", format_amount(account.current_balance));
        Ok(())
    })
}

fn run_record(
    kind: RecordKind,
    amount: Option<String>,
    due: Option<String>,
    description: Option<String>,
    counterparty: Option<String>,
    json: bool,
) -> Result<()> {
    let ctx = get_context()?;

    let amount = parse_amount(&prompt_if_missing(amount, "Amount")?)?;
    let due_date = due.as_deref().map(parse_date).transpose()?;

    let input = NewRecord {
        kind,
        amount,
        due_date,
        description: description.unwrap_or_default(),
        counterparty,
    };

    emit(json, ctx.record_service.create(input), |record| {
        success(&format!("{} created", record.kind));
        println!("  ID: {}", record.id);
        println!("  Amount: {}", format_amount(record.amount));
        if let Some(due) = record.due_date {
            println!("  Due: {}", due);
        }
        Ok(())
    })
}
