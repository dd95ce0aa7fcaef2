// crates/kjvonly-core/src/search.rs

use serde::{Deserialize, Serialize};

/// Tabular result of a SQL query against the search engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SqlResult {
    /// Column descriptors, in row order.
    #[serde(default)]
    pub columns: Vec<Column>,
    /// Result rows; each row has one value per column.
    #[serde(default)]
    pub rows: Vec<Vec<serde_json::Value>>,
}

/// A result column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
}

impl SqlResult {
    /// Number of rows returned.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the query matched nothing.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
