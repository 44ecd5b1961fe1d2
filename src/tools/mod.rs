//! MCP tool implementations.
//!
//! - `catalog`: list_databases, list_views, describe_view, query_view
//! - `query`: execute_query
//! - `sql_validator`: read-only statement gate
//! - `format`: markdown rendering of result rows

pub mod catalog;
pub mod format;
pub mod query;
pub mod sql_validator;

pub use catalog::{CatalogToolHandler, DescribeViewInput, ListViewsInput, QueryViewInput};
pub use query::{ExecuteQueryInput, QueryToolHandler};
