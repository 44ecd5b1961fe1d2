//! Catalog exploration tools.
//!
//! Implements `list_databases`, `list_views`, `describe_view` and
//! `query_view`. Each handler borrows the shared session for one call and
//! renders a text block.

use crate::db::{ConnectionManager, Session};
use crate::error::{DbError, DbResult};
use crate::models::{DEFAULT_VIEW_ROW_LIMIT, effective_limit};
use crate::tools::format::format_as_markdown;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Input for the list_views tool.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ListViewsInput {
    /// Database to list views from (required)
    #[serde(default)]
    pub database: String,
    /// Schema to list views from. Defaults to the session's current schema.
    #[serde(default, alias = "schema_name")]
    pub schema: Option<String>,
}

/// Input for the describe_view tool.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct DescribeViewInput {
    /// Database containing the view (required)
    #[serde(default)]
    pub database: String,
    /// Name of the view (required)
    #[serde(default)]
    pub view_name: String,
    /// Schema containing the view. Defaults to the session's current schema.
    #[serde(default, alias = "schema_name")]
    pub schema: Option<String>,
}

/// Input for the query_view tool.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct QueryViewInput {
    /// Database containing the view (required)
    #[serde(default)]
    pub database: String,
    /// Name of the view (required)
    #[serde(default)]
    pub view_name: String,
    /// Schema containing the view. Defaults to the session's current schema.
    #[serde(default, alias = "schema_name")]
    pub schema: Option<String>,
    /// Maximum rows to return. Default: 10, max: 10000
    #[serde(default)]
    pub limit: Option<i64>,
}

/// Reject empty required arguments.
pub fn require<'a>(value: &'a str, parameter: &str) -> DbResult<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DbError::invalid_input(format!(
            "{} parameter is required",
            parameter
        )));
    }
    Ok(value)
}

/// Check that a caller-supplied identifier is safe to interpolate into SQL.
///
/// Accepts unquoted Snowflake identifiers, optionally dotted
/// (`DB.SCHEMA`). Anything carrying whitespace, quotes, semicolons or
/// comment markers is rejected.
pub fn validate_identifier<'a>(value: &'a str, parameter: &str) -> DbResult<&'a str> {
    let value = require(value, parameter)?;
    let valid_part = |part: &str| {
        !part.is_empty()
            && part
                .chars()
                .all(|c| c.is_alphanumeric() || c == '_' || c == '$')
    };
    if !value.split('.').all(valid_part) {
        return Err(DbError::invalid_input(format!(
            "Invalid {} '{}': only letters, digits, '_', '$' and '.' are allowed",
            parameter, value
        )));
    }
    Ok(value)
}

/// The schema to use: the validated argument, or the session's current schema.
pub async fn resolve_schema(session: &dyn Session, schema: Option<&str>) -> DbResult<String> {
    if let Some(schema) = schema.map(str::trim).filter(|s| !s.is_empty()) {
        return Ok(validate_identifier(schema, "schema")?.to_string());
    }
    let result = session.execute("SELECT CURRENT_SCHEMA()", Some(1)).await?;
    result.scalar().map(str::to_string).ok_or_else(|| {
        DbError::invalid_input("Could not determine current schema; pass the schema parameter")
    })
}

/// Handler for the catalog exploration tools.
#[derive(Clone)]
pub struct CatalogToolHandler {
    connection_manager: Arc<ConnectionManager>,
}

impl CatalogToolHandler {
    pub fn new(connection_manager: Arc<ConnectionManager>) -> Self {
        Self { connection_manager }
    }

    /// `SHOW DATABASES`, one name per line.
    pub async fn list_databases(&self) -> DbResult<String> {
        let session = self.connection_manager.get_connection().await?;
        let result = session.execute("SHOW DATABASES", None).await?;

        let names: Vec<&str> = result
            .rows
            .iter()
            .filter_map(|row| result.value(row, "name", 1))
            .collect();
        info!(count = names.len(), "Listed databases");
        Ok(format!("Available Snowflake databases:\n{}", names.join("\n")))
    }

    /// Views in `database.schema` with their creation time.
    pub async fn list_views(&self, input: ListViewsInput) -> DbResult<String> {
        let database = validate_identifier(&input.database, "database")?;
        let session = self.connection_manager.get_connection().await?;

        session
            .execute(&format!("USE DATABASE {}", database), None)
            .await?;
        let schema = match input.schema.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(schema) => {
                let schema = validate_identifier(schema, "schema")?;
                session
                    .execute(&format!("USE SCHEMA {}", schema), None)
                    .await?;
                schema.to_string()
            }
            None => resolve_schema(session.as_ref(), None).await?,
        };

        let result = session
            .execute(&format!("SHOW VIEWS IN {}.{}", database, schema), None)
            .await?;
        let views: Vec<String> = result
            .rows
            .iter()
            .map(|row| {
                format!(
                    "{} (created: {})",
                    result.value(row, "name", 1).unwrap_or("NULL"),
                    result.value(row, "created_on", 0).unwrap_or("NULL")
                )
            })
            .collect();

        debug!(database, schema = %schema, count = views.len(), "Listed views");
        if views.is_empty() {
            return Ok(format!("No views found in {}.{}", database, schema));
        }
        Ok(format!(
            "Views in {}.{}:\n{}",
            database,
            schema,
            views.join("\n")
        ))
    }

    /// Columns and DDL of one view.
    pub async fn describe_view(&self, input: DescribeViewInput) -> DbResult<String> {
        let database = validate_identifier(&input.database, "database")?;
        let view_name = validate_identifier(&input.view_name, "view_name")?;
        let session = self.connection_manager.get_connection().await?;

        let schema = resolve_schema(session.as_ref(), input.schema.as_deref()).await?;
        let full_view_name = format!("{}.{}.{}", database, schema, view_name);

        let result = session
            .execute(&format!("DESCRIBE VIEW {}", full_view_name), None)
            .await?;
        if result.rows.is_empty() {
            return Ok(format!(
                "View {} not found or you don't have permission to access it.",
                full_view_name
            ));
        }

        let columns: Vec<String> = result
            .rows
            .iter()
            .map(|row| {
                let nullable = result.value(row, "null?", 3) == Some("Y");
                format!(
                    "{} : {} {}",
                    result.value(row, "name", 0).unwrap_or("NULL"),
                    result.value(row, "type", 1).unwrap_or("NULL"),
                    if nullable { "NULL" } else { "NOT NULL" }
                )
            })
            .collect();

        let ddl_result = session
            .execute(
                &format!("SELECT GET_DDL('VIEW', '{}')", full_view_name),
                Some(1),
            )
            .await?;
        let ddl = ddl_result.scalar().unwrap_or("Definition not available");

        let mut output = format!("## View: {}\n\n### Columns:\n", full_view_name);
        for column in &columns {
            output.push_str(&format!("- {}\n", column));
        }
        output.push_str("\n### View Definition:\n```sql\n");
        output.push_str(ddl);
        output.push_str("\n```");
        Ok(output)
    }

    /// Up to `limit` rows of a view as a markdown table.
    pub async fn query_view(&self, input: QueryViewInput) -> DbResult<String> {
        let database = validate_identifier(&input.database, "database")?;
        let view_name = validate_identifier(&input.view_name, "view_name")?;
        let limit = effective_limit(input.limit, DEFAULT_VIEW_ROW_LIMIT);
        let session = self.connection_manager.get_connection().await?;

        let schema = resolve_schema(session.as_ref(), input.schema.as_deref()).await?;
        let full_view_name = format!("{}.{}.{}", database, schema, view_name);

        let result = session
            .execute(
                &format!("SELECT * FROM {} LIMIT {}", full_view_name, limit),
                Some(limit as usize),
            )
            .await?;
        if result.rows.is_empty() {
            return Ok(format!(
                "No data found in view {} or the view is empty.",
                full_view_name
            ));
        }

        Ok(format!(
            "## Data from {} (Showing {} rows)\n\n{}",
            full_view_name,
            result.rows.len(),
            format_as_markdown(&result.column_names(), &result.rows)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_rejects_blank() {
        let err = require("  ", "database").unwrap_err();
        assert_eq!(err.to_string(), "Invalid input: database parameter is required");
        assert_eq!(require(" SALES ", "database").unwrap(), "SALES");
    }

    #[test]
    fn test_validate_identifier_accepts_plain_and_dotted() {
        for ok in ["SALES", "my_db", "ANALYTICS.PUBLIC", "v$1"] {
            assert!(validate_identifier(ok, "database").is_ok(), "{} should pass", ok);
        }
    }

    #[test]
    fn test_validate_identifier_rejects_injection() {
        for bad in [
            "SALES; DROP DATABASE X",
            "a b",
            "\"quoted\"",
            "x'--",
            "db..schema",
            "db.",
            "a/*b*/",
        ] {
            let err = validate_identifier(bad, "database").unwrap_err();
            assert!(matches!(err, DbError::InvalidInput { .. }), "{} should fail", bad);
        }
    }

    #[test]
    fn test_input_accepts_schema_name_alias() {
        let input: ListViewsInput =
            serde_json::from_str(r#"{"database":"SALES","schema_name":"PUBLIC"}"#).unwrap();
        assert_eq!(input.schema.as_deref(), Some("PUBLIC"));
    }

    #[test]
    fn test_missing_required_fields_deserialize_empty() {
        let input: DescribeViewInput = serde_json::from_str("{}").unwrap();
        assert!(input.database.is_empty());
        assert!(input.view_name.is_empty());
        assert!(input.schema.is_none());
    }
}
