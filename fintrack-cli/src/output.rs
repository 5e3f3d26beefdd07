//! Output formatting utilities

use anyhow::Result;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use serde::Serialize;

use fintrack_core::{Category, TransactionWithCategory};

pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg.green());
}

pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

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

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn categories_table(categories: &[Category]) -> Table {
    let mut table = create_table();
    table.set_header(vec!["ID", "Name", "Type"]);
    for category in categories {
        table.add_row(vec![
            category.id.to_string(),
            category.name.clone(),
            category.category_type.to_string(),
        ]);
    }
    table
}

pub fn transactions_table(entries: &[TransactionWithCategory]) -> Table {
    let mut table = create_table();
    table.set_header(vec!["ID", "Date", "Amount", "Currency", "Category", "Description"]);
    for entry in entries {
        let tx = &entry.transaction;
        table.add_row(vec![
            tx.id.to_string(),
            tx.date.format("%Y-%m-%d").to_string(),
            tx.amount.to_string(),
            tx.currency.to_string(),
            format!("{} ({})", entry.category.name, entry.category.category_type),
            tx.description.clone(),
        ]);
    }
    table
}
