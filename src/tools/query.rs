//! Query execution tool.
//!
//! This module implements the `execute_query` MCP tool. Only read-only
//! statements pass the gate; a `LIMIT` is appended when the query has none.

use crate::db::ConnectionManager;
use crate::error::DbResult;
use crate::models::{DEFAULT_ROW_LIMIT, effective_limit};
use crate::tools::catalog::{require, validate_identifier};
use crate::tools::format::format_as_markdown;
use crate::tools::sql_validator;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

/// Input for the execute_query tool.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ExecuteQueryInput {
    /// SQL to execute. Only SELECT, SHOW, DESCRIBE, EXPLAIN and WITH statements are allowed.
    #[serde(default)]
    pub query: String,
    /// Database to switch to before running the query
    #[serde(default)]
    pub database: Option<String>,
    /// Schema to switch to before running the query
    #[serde(default, alias = "schema_name")]
    pub schema: Option<String>,
    /// Maximum rows to return. Default: 100, max: 10000
    #[serde(default)]
    pub limit: Option<i64>,
}

/// Append ` LIMIT <limit>;` unless the query already mentions `LIMIT `.
///
/// The check is a plain substring match on the upper-cased text, so a
/// `LIMIT ` inside a string literal or comment also counts.
pub fn ensure_limit(query: &str, limit: u32) -> String {
    if query.to_uppercase().contains("LIMIT ") {
        return query.to_string();
    }
    let base = query.trim_end().trim_end_matches(';');
    format!("{} LIMIT {};", base, limit)
}

/// Handler for the execute_query tool.
#[derive(Clone)]
pub struct QueryToolHandler {
    connection_manager: Arc<ConnectionManager>,
}

impl QueryToolHandler {
    pub fn new(connection_manager: Arc<ConnectionManager>) -> Self {
        Self { connection_manager }
    }

    /// Validate, optionally switch context, run, and render the result.
    pub async fn execute_query(&self, input: ExecuteQueryInput) -> DbResult<String> {
        let query = require(&input.query, "query")?;
        sql_validator::validate_readonly(query)?;

        let database = non_blank(input.database.as_deref())
            .map(|db| validate_identifier(db, "database"))
            .transpose()?;
        let schema = non_blank(input.schema.as_deref())
            .map(|schema| validate_identifier(schema, "schema"))
            .transpose()?;
        let limit = effective_limit(input.limit, DEFAULT_ROW_LIMIT);

        let session = self.connection_manager.get_connection().await?;
        if let Some(database) = database {
            session
                .execute(&format!("USE DATABASE {}", database), None)
                .await?;
        }
        if let Some(schema) = schema {
            session
                .execute(&format!("USE SCHEMA {}", schema), None)
                .await?;
        }

        let context = session
            .execute("SELECT CURRENT_DATABASE(), CURRENT_SCHEMA()", Some(1))
            .await?;
        let (current_db, current_schema) = match context.rows.first() {
            Some(row) => (
                row.first().and_then(|c| c.as_deref()).unwrap_or("Unknown"),
                row.get(1).and_then(|c| c.as_deref()).unwrap_or("Unknown"),
            ),
            None => ("Unknown", "Unknown"),
        };

        let sql = ensure_limit(query, limit);
        let result = session.execute(&sql, Some(limit as usize)).await?;
        info!(
            database = current_db,
            schema = current_schema,
            row_count = result.rows.len(),
            execution_time_ms = result.execution_time_ms,
            "Query executed"
        );

        if result.rows.is_empty() {
            return Ok(format!(
                "Query executed successfully in {}.{}, but returned no results.",
                current_db, current_schema
            ));
        }

        let row_count = result.rows.len();
        Ok(format!(
            "## Query Results (Database: {}, Schema: {})\n\nShowing {} row{}\n\n```sql\n{}\n```\n\n{}",
            current_db,
            current_schema,
            row_count,
            if row_count == 1 { "" } else { "s" },
            sql,
            format_as_markdown(&result.column_names(), &result.rows)
        ))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_limit_appends() {
        assert_eq!(ensure_limit("SELECT * FROM t", 100), "SELECT * FROM t LIMIT 100;");
    }

    #[test]
    fn test_ensure_limit_strips_trailing_semicolons() {
        assert_eq!(ensure_limit("SELECT * FROM t;  ", 5), "SELECT * FROM t LIMIT 5;");
        assert_eq!(ensure_limit("SELECT 1;;", 5), "SELECT 1 LIMIT 5;");
    }

    #[test]
    fn test_ensure_limit_keeps_existing_limit() {
        assert_eq!(ensure_limit("SELECT * FROM t LIMIT 5", 100), "SELECT * FROM t LIMIT 5");
        assert_eq!(ensure_limit("select * from t limit 5", 100), "select * from t limit 5");
    }

    #[test]
    fn test_ensure_limit_substring_match_in_literal() {
        // A literal containing "limit " suppresses the append.
        let sql = "SELECT 'no limit here' AS note";
        assert_eq!(ensure_limit(sql, 100), sql);
    }

    #[test]
    fn test_ensure_limit_requires_trailing_space() {
        assert_eq!(
            ensure_limit("SELECT limits FROM t", 10),
            "SELECT limits FROM t LIMIT 10;"
        );
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  ")), None);
        assert_eq!(non_blank(Some(" DB ")), Some("DB"));
        assert_eq!(non_blank(None), None);
    }
}
