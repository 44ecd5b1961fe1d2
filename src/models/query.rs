//! Query-related data models.
//!
//! This module defines the result shape returned by a Snowflake session and
//! the row limits applied by the query tools.

use serde::{Deserialize, Serialize};

/// Default row limit for `execute_query`.
pub const DEFAULT_ROW_LIMIT: u32 = 100;

/// Default row limit for `query_view`.
pub const DEFAULT_VIEW_ROW_LIMIT: u32 = 10;

/// Maximum allowed row limit.
pub const MAX_ROW_LIMIT: u32 = 10000;

/// Clamp a caller-supplied limit into `1..=MAX_ROW_LIMIT`.
pub fn effective_limit(requested: Option<i64>, default: u32) -> u32 {
    let clamped = requested
        .unwrap_or(i64::from(default))
        .clamp(1, i64::from(MAX_ROW_LIMIT));
    clamped as u32
}

/// Column metadata from a result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub name: String,
    /// Snowflake type name, e.g. "text", "fixed", "timestamp_ltz"
    pub type_name: String,
    pub nullable: bool,
}

impl ColumnMetadata {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            nullable,
        }
    }
}

/// A single result cell. Snowflake's JSON result format delivers every value
/// as text; `None` is SQL NULL.
pub type Cell = Option<String>;

/// Result of executing one statement on a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResult {
    pub columns: Vec<ColumnMetadata>,
    pub rows: Vec<Vec<Cell>>,
    pub execution_time_ms: u64,
}

impl QueryResult {
    pub fn new(columns: Vec<ColumnMetadata>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            columns,
            rows,
            execution_time_ms: 0,
        }
    }

    /// Column names in result order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Index of a column by case-insensitive name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Value of a named column in `row`, falling back to `fallback_index`
    /// when the column name is not present in the result metadata.
    pub fn value<'a>(&self, row: &'a [Cell], name: &str, fallback_index: usize) -> Option<&'a str> {
        let idx = self.column_index(name).unwrap_or(fallback_index);
        row.get(idx).and_then(|cell| cell.as_deref())
    }

    /// First cell of the first row, if any.
    pub fn scalar(&self) -> Option<&str> {
        self.rows
            .first()
            .and_then(|row| row.first())
            .and_then(|cell| cell.as_deref())
    }
}
