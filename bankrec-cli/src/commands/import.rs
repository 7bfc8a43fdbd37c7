//! Import command - load statement files

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Color};

use super::{get_context, get_logger, log_event, parse_id};
use crate::output::{amount_cell, create_table, emit, format_amount, success, warning};
use bankrec_core::services::events;
use bankrec_core::{error_code, LogEvent};

/// Preview rows shown before the table is truncated
const PREVIEW_ROWS: usize = 15;

pub fn run(file: PathBuf, account_id: &str, preview: bool, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let account_id = parse_id(account_id, "account")?;
    let user = ctx.acting_user();

    let logger = get_logger();
    let result = ctx
        .import_service
        .import_file(account_id, &file, &user, preview);

    if !preview {
        match &result {
            Ok(_) => log_event(
                &logger,
                LogEvent::new(events::IMPORT_COMPLETED).with_command("import"),
            ),
            Err(e) => log_event(
                &logger,
                LogEvent::new(events::IMPORT_FAILED)
                    .with_command("import")
                    .with_error(error_code(e))
                    .with_error_details(e.to_string()),
            ),
        }
    }

    emit(json, result, |result| {
        if result.preview {
            warning("PREVIEW MODE - No changes applied");
            println!();

            if let Some(lines) = &result.lines {
                let mut table = create_table();
                table.set_header(vec!["Date", "Amount", "FITID", "Description", ""]);
                for line in lines.iter().take(PREVIEW_ROWS) {
                    let verdict = if line.duplicate {
                        Cell::new("duplicate").fg(Color::Yellow)
                    } else {
                        Cell::new("new").fg(Color::Green)
                    };
                    table.add_row(vec![
                        Cell::new(
                            line.posted_at
                                .map(|d| d.date().to_string())
                                .unwrap_or_else(|| "-".to_string()),
                        ),
                        amount_cell(line.amount),
                        Cell::new(line.bank_ref.as_deref().unwrap_or("-")),
                        Cell::new(&line.description),
                        verdict,
                    ]);
                }
                println!("{}", table);
                if lines.len() > PREVIEW_ROWS {
                    println!("... and {} more", lines.len() - PREVIEW_ROWS);
                }
            }
            println!();
            println!("  Would import: {}", result.inserted);
            println!("  Duplicates: {}", result.duplicates);
            return Ok(());
        }

        success("Import complete");
        println!();
        println!("  In file: {}", result.total_in_file);
        println!("  Imported: {}", result.inserted);
        println!("  Duplicates: {}", result.duplicates);
        if let (Some(start), Some(end)) = (result.period.start, result.period.end) {
            println!("  Period: {} to {}", start.date(), end.date());
        }
        if let Some(balance) = result.balance.amount {
            println!("  Statement balance: {}", format_amount(balance));
        }
        Ok(())
    })
}

/// List recorded imports
pub fn list(account_id: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let account_id = account_id
        .as_deref()
        .map(|id| parse_id(id, "account"))
        .transpose()?;

    emit(json, ctx.import_service.list_imports(account_id), |imports| {
        if imports.is_empty() {
            println!("No imports recorded.");
            return Ok(());
        }

        let mut table = create_table();
        table.set_header(vec!["Imported", "File", "Account", "Lines", "Balance", "By"]);
        for i in imports {
            table.add_row(vec![
                Cell::new(i.imported_at.format("%Y-%m-%d %H:%M")),
                Cell::new(&i.filename),
                Cell::new(i.account_id),
                Cell::new(i.transaction_count),
                Cell::new(format_amount(i.closing_balance)),
                Cell::new(&i.imported_by),
            ]);
        }
        println!("{}", table);
        Ok(())
    })
}
