// crates/kjvonly-cli/src/output.rs
//
// Output formatting utilities for the kjvonly CLI.
// Supports table and JSON output modes.

use serde::Serialize;
use serde_json::Value;
use tabled::builder::Builder;
use tabled::{Table, Tabled};

/// Format a slice of Tabled items as a table string.
pub fn format_table<T: Tabled>(data: &[T]) -> String {
    Table::new(data).to_string()
}

/// Format a serializable value as a pretty-printed JSON string.
pub fn format_json<T: Serialize>(data: &T) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|e| format!("JSON serialization error: {}", e))
}

/// Render an Elasticsearch SQL result (`{columns: [{name, type}], rows}`)
/// as a table. Column names form the header; strings print unquoted.
pub fn format_sql_table(result: &Value) -> String {
    let columns = result["columns"].as_array().cloned().unwrap_or_default();
    let rows = result["rows"].as_array().cloned().unwrap_or_default();

    let mut builder = Builder::default();
    builder.push_record(
        columns
            .iter()
            .map(|c| c["name"].as_str().unwrap_or_default().to_string()),
    );
    for row in &rows {
        let cells = row.as_array().cloned().unwrap_or_default();
        builder.push_record(cells.iter().map(cell_text));
    }
    builder.build().to_string()
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
