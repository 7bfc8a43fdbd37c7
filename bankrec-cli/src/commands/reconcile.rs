//! Reconcile, ignore and auto commands - settle pending bank transactions

use anyhow::Result;
use comfy_table::Cell;

use super::{get_context, get_logger, log_event, parse_id};
use crate::output::{create_table, emit, format_amount, success, warning};
use bankrec_core::services::events;
use bankrec_core::{error_code, Error, LogEvent, LoggingService, RecordKind};

/// Log the completed/failed pair for one state change
fn log_outcome<T>(
    logger: &Option<LoggingService>,
    command: &str,
    completed: &str,
    failed: &str,
    result: &Result<T, Error>,
) {
    let event = match result {
        Ok(_) => LogEvent::new(completed).with_command(command),
        Err(e) => LogEvent::new(failed)
            .with_command(command)
            .with_error(error_code(e))
            .with_error_details(e.to_string()),
    };
    log_event(logger, event);
}

pub fn run(transaction_id: &str, kind: RecordKind, record_id: &str, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let transaction_id = parse_id(transaction_id, "transaction")?;
    let record_id = parse_id(record_id, "record")?;
    let user = ctx.acting_user();

    let result = ctx
        .reconcile_service
        .reconcile(transaction_id, kind, record_id, &user);
    log_outcome(
        &get_logger(),
        "reconcile",
        events::RECONCILE_COMPLETED,
        events::RECONCILE_FAILED,
        &result,
    );

    emit(json, result, |outcome| {
        success("Transaction reconciled");
        println!("  Transaction: {}", outcome.transaction_id);
        println!("  {}: {}", outcome.record_kind, outcome.record_id);
        println!("  Amount: {}", format_amount(outcome.amount));
        println!("  Paid on: {}", outcome.paid_date);
        println!("  By: {}", outcome.processed_by);
        Ok(())
    })
}

pub fn run_ignore(transaction_id: &str, reason: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let transaction_id = parse_id(transaction_id, "transaction")?;
    let user = ctx.acting_user();

    let result = ctx.reconcile_service.ignore(
        transaction_id,
        reason.as_deref().unwrap_or_default(),
        &user,
    );
    log_outcome(
        &get_logger(),
        "ignore",
        events::IGNORE_COMPLETED,
        events::IGNORE_FAILED,
        &result,
    );

    emit(json, result, |outcome| {
        success("Transaction ignored");
        println!("  Transaction: {}", outcome.transaction_id);
        println!("  Reason: {}", outcome.reason);
        Ok(())
    })
}

pub fn run_auto(account_id: &str, dry_run: bool, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let account_id = parse_id(account_id, "account")?;
    let user = ctx.acting_user();

    let result = ctx
        .reconcile_service
        .auto_reconcile(account_id, &user, dry_run);
    if !dry_run && result.is_ok() {
        log_event(
            &get_logger(),
            LogEvent::new(events::AUTO_RECONCILE_COMPLETED).with_command("auto"),
        );
    }

    emit(json, result, |result| {
        if result.dry_run {
            warning("DRY RUN - No changes applied");
            println!();
        }

        if result.matches.is_empty() {
            println!(
                "No unambiguous matches among {} pending transaction(s).",
                result.examined
            );
            return Ok(());
        }

        let mut table = create_table();
        table.set_header(vec!["Transaction", "Record", "Amount", "Days"]);
        for m in &result.matches {
            table.add_row(vec![
                Cell::new(m.transaction_id),
                Cell::new(format!("{} {}", m.record_kind, m.record_id)),
                Cell::new(format_amount(m.amount)),
                Cell::new(m.day_distance),
            ]);
        }
        println!("{}", table);
        println!();

        if result.dry_run {
            println!(
                "  Would reconcile: {} of {}",
                result.matches.len(),
                result.examined
            );
        } else {
            println!("  Reconciled: {} of {}", result.reconciled, result.examined);
        }
        for failure in &result.failures {
            warning(&format!(
                "  {} not reconciled: {}",
                failure.transaction_id, failure.error
            ));
        }
        Ok(())
    })
}
