//! Output formatting for listing commands.
//!
//! The default `plain` format is the tool's stable, script-facing contract:
//! one resource per line, fields joined with `", "`. Table and JSON formats
//! are conveniences on top of the same rows.

use colored::Colorize;
use serde::Serialize;
use tabled::{Table, Tabled};

/// Output format.
#[derive(Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    /// Comma-joined lines (the scriptable default).
    #[default]
    Plain,
    /// Human-readable table format.
    Table,
    /// JSON format.
    Json,
}

/// A row that knows its plain-format field values.
pub trait PlainRow {
    fn fields(&self) -> Vec<String>;
}

/// Print data in the specified format.
pub fn print_output<T: Serialize + Tabled + PlainRow>(data: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Plain => {
            for row in data {
                println!("{}", PlainRow::fields(row).join(", "));
            }
        }
        OutputFormat::Table => {
            if data.is_empty() {
                println!("{}", "No items found.".dimmed());
            } else {
                let table = Table::new(data).to_string();
                println!("{}", table);
            }
        }
        OutputFormat::Json => {
            let json =
                serde_json::to_string_pretty(data).unwrap_or_else(|_| "[]".to_string());
            println!("{}", json);
        }
    }
}

/// Print a success message.
pub fn print_success(message: &str) {
    println!("{} {}", "Success:".green().bold(), message);
}
