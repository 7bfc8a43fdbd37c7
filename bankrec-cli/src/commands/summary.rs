//! Summary command - reconciliation progress by status

use anyhow::Result;
use colored::Colorize;
use comfy_table::{ContentArrangement, Table};

use super::{get_context, parse_id};
use crate::output::{emit, format_amount};

pub fn run(account_id: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let account_id = account_id
        .as_deref()
        .map(|id| parse_id(id, "account"))
        .transpose()?;

    emit(json, ctx.status_service.summary(account_id), |summary| {
        match summary.account_id {
            Some(id) => println!("{} {}", "Reconciliation Summary".bold(), id),
            None => println!("{}", "Reconciliation Summary (all accounts)".bold()),
        }
        println!();

        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.add_row(vec!["Transactions", &summary.total.to_string()]);
        table.add_row(vec!["Pending", &summary.pending.to_string()]);
        table.add_row(vec!["Reconciled", &summary.reconciled.to_string()]);
        table.add_row(vec!["Ignored", &summary.ignored.to_string()]);
        table.add_row(vec!["Pending credits", &format_amount(summary.pending_credits)]);
        table.add_row(vec!["Pending debits", &format_amount(summary.pending_debits)]);
        println!("{}", table);

        if summary.total > 0 {
            let done = summary.reconciled + summary.ignored;
            println!();
            println!("{}% processed", done * 100 / summary.total);
        }
        Ok(())
    })
}
