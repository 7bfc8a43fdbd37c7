//! Output formatting utilities

use anyhow::Result;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Color, ContentArrangement, Table};
use rust_decimal::Decimal;
use serde::Serialize;

use bankrec_core::domain::result::Result as CoreResult;
use bankrec_core::OperationResult;

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Render a core result
///
/// With `json` the result is printed as an `OperationResult` envelope and a failure
/// exits with status 1. Otherwise errors propagate and `render` prints the data.
pub fn emit<T: Serialize>(
    json: bool,
    result: CoreResult<T>,
    render: impl FnOnce(&T) -> Result<()>,
) -> Result<()> {
    if json {
        let envelope: OperationResult<T> = result.into();
        println!("{}", serde_json::to_string_pretty(&envelope)?);
        if !envelope.success {
            std::process::exit(1);
        }
        return Ok(());
    }
    render(&result?)
}

/// Money with two decimals
pub fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", amount)
}

/// Money cell, green for credits and red for debits
pub fn amount_cell(amount: Decimal) -> Cell {
    let cell = Cell::new(format_amount(amount));
    if amount > Decimal::ZERO {
        cell.fg(Color::Green)
    } else if amount < Decimal::ZERO {
        cell.fg(Color::Red)
    } else {
        cell
    }
}

/// Format bytes as human-readable size
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount_pads_to_cents() {
        assert_eq!(format_amount(Decimal::new(5, 0)), "5.00");
        assert_eq!(format_amount(Decimal::new(-25075, 2)), "-250.75");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 bytes");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }
}
