//! Pending command - list bank transactions awaiting a decision

use anyhow::Result;
use comfy_table::Cell;

use super::{get_context, parse_date, parse_id};
use crate::output::{amount_cell, create_table, emit, format_amount};
use bankrec_core::PendingFilter;

pub fn run(
    account_id: Option<String>,
    from: Option<String>,
    to: Option<String>,
    json: bool,
) -> Result<()> {
    let ctx = get_context()?;

    let filter = PendingFilter {
        account_id: account_id
            .as_deref()
            .map(|id| parse_id(id, "account"))
            .transpose()?,
        from: from.as_deref().map(parse_date).transpose()?,
        to: to.as_deref().map(parse_date).transpose()?,
    };

    emit(json, ctx.status_service.list_pending(&filter), |transactions| {
        if transactions.is_empty() {
            println!("Nothing pending.");
            return Ok(());
        }

        let mut table = create_table();
        table.set_header(vec!["ID", "Date", "Amount", "Type", "FITID", "Description"]);
        for tx in transactions {
            table.add_row(vec![
                Cell::new(tx.id),
                Cell::new(
                    tx.posted_at
                        .map(|d| d.date().to_string())
                        .unwrap_or_else(|| "-".to_string()),
                ),
                amount_cell(tx.amount),
                Cell::new(&tx.trn_type),
                Cell::new(tx.bank_ref.as_deref().unwrap_or("-")),
                Cell::new(&tx.description),
            ]);
        }
        println!("{}", table);

        let total: rust_decimal::Decimal = transactions.iter().map(|t| t.amount).sum();
        println!(
            "{} pending, net {}",
            transactions.len(),
            format_amount(total)
        );
        Ok(())
    })
}
