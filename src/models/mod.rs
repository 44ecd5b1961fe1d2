//! Data models for the Snowflake MCP Server.
//!
//! This module re-exports all model types used throughout the application.

pub mod connection;
pub mod query;

// Re-export commonly used types
pub use connection::{AuthType, SnowflakeConfig};
pub use query::{
    Cell, ColumnMetadata, DEFAULT_ROW_LIMIT, DEFAULT_VIEW_ROW_LIMIT, MAX_ROW_LIMIT, QueryResult,
    effective_limit,
};
