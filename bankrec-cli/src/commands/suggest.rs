//! Suggest command - ranked candidate records for one transaction

use anyhow::Result;
use colored::Colorize;
use comfy_table::{Cell, Color};
use rust_decimal::Decimal;

use super::{get_context, parse_id};
use crate::output::{create_table, emit, format_amount, info};

pub fn run(transaction_id: &str, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let transaction_id = parse_id(transaction_id, "transaction")?;
    let tolerance = ctx.config.matching.tolerance_percent;

    emit(json, ctx.match_service.suggest(transaction_id), |s| {
        let tx = &s.transaction;
        println!(
            "{} {} {} ({})",
            "Transaction".bold(),
            tx.id,
            format_amount(tx.amount),
            tx.status
        );
        if !tx.description.is_empty() {
            println!("  {}", tx.description.dimmed());
        }
        println!();

        let Some(kind) = s.record_kind else {
            println!("Zero-amount transactions have nothing to match.");
            return Ok(());
        };
        if s.candidates.is_empty() {
            println!(
                "No open {} within {}% of {}.",
                kind,
                tolerance,
                format_amount(tx.abs_amount())
            );
            return Ok(());
        }

        let mut table = create_table();
        table.set_header(vec!["Record", "Amount", "Due", "Days", "Similarity", "Description"]);
        for c in &s.candidates {
            let score = Cell::new(format!("{:.2}%", c.similarity));
            let score = if c.similarity == Decimal::ONE_HUNDRED {
                score.fg(Color::Green)
            } else {
                score
            };
            table.add_row(vec![
                Cell::new(c.record.id),
                Cell::new(format_amount(c.record.amount)),
                Cell::new(
                    c.record
                        .due_date
                        .map(|d| d.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                ),
                Cell::new(
                    c.day_distance
                        .map(|d| d.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                ),
                score,
                Cell::new(&c.record.description),
            ]);
        }
        println!("{}", table);
        println!();
        info(&format!(
            "Reconcile with: bankrec reconcile {} {} <RECORD>",
            tx.id, kind
        ));
        Ok(())
    })
}
