//! Accounts command - list bank accounts with their balances

use anyhow::Result;
use colored::Colorize;
use comfy_table::{Cell, Color};

use super::get_context;
use crate::output::{amount_cell, create_table, emit};

pub fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;

    emit(json, ctx.account_service.list(), |overviews| {
        if overviews.is_empty() {
            println!("No accounts yet. Create one with 'bankrec new account'.");
            return Ok(());
        }

        let mut table = create_table();
        table.set_header(vec!["ID", "Account", "Type", "Balance", "Computed", "Pending"]);
        for o in overviews {
            let computed = if o.is_consistent() {
                amount_cell(o.computed_balance)
            } else {
                Cell::new(format!("{:.2} (drift)", o.computed_balance)).fg(Color::Yellow)
            };
            table.add_row(vec![
                Cell::new(o.account.id),
                Cell::new(o.account.label()),
                Cell::new(&o.account.account_type),
                amount_cell(o.account.current_balance),
                computed,
                Cell::new(o.pending_count),
            ]);
        }
        println!("{}", table);

        if overviews.iter().any(|o| !o.is_consistent()) {
            println!();
            println!(
                "{}",
                "Some balances drifted from their reconciled transactions. Run 'bankrec doctor'."
                    .yellow()
            );
        }
        Ok(())
    })
}
