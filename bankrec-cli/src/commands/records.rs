//! Records command - list receivables and payables

use anyhow::Result;
use comfy_table::Cell;

use super::get_context;
use crate::output::{create_table, emit, format_amount};
use bankrec_core::{RecordKind, RecordStatus};

pub fn run(kind: Option<RecordKind>, status: Option<RecordStatus>, all: bool, json: bool) -> Result<()> {
    let ctx = get_context()?;

    let result = if all || status.is_some() {
        ctx.record_service.list(kind, status)
    } else {
        ctx.record_service.list_open(kind)
    };

    emit(json, result, |records| {
        if records.is_empty() {
            println!("No records found.");
            return Ok(());
        }

        let mut table = create_table();
        table.set_header(vec![
            "ID",
            "Kind",
            "Amount",
            "Due",
            "Status",
            "Paid",
            "Description",
        ]);
        for r in records {
            let paid = match (r.paid_date, r.paid_amount) {
                (Some(date), Some(amount)) => format!("{} on {}", format_amount(amount), date),
                _ => String::new(),
            };
            table.add_row(vec![
                Cell::new(r.id),
                Cell::new(r.kind),
                Cell::new(format_amount(r.amount)),
                Cell::new(r.due_date.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string())),
                Cell::new(r.status),
                Cell::new(paid),
                Cell::new(&r.description),
            ]);
        }
        println!("{}", table);
        println!("{} record(s)", records.len());
        Ok(())
    })
}
