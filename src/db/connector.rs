//! Connection factory seam.
//!
//! The lifecycle manager only talks to these traits, so it can be driven by
//! the real Snowflake client or by an in-memory fake in tests.

use crate::error::DbResult;
use crate::models::{QueryResult, SnowflakeConfig};
use async_trait::async_trait;
use std::sync::Arc;

/// One authenticated database session.
///
/// Owned by the [`ConnectionManager`](crate::db::ConnectionManager); callers
/// borrow it for a single operation and must not close it themselves.
#[async_trait]
pub trait Session: Send + Sync {
    /// Execute one statement and fetch at most `max_rows` rows
    /// (`None` fetches everything the server returns).
    async fn execute(&self, sql: &str, max_rows: Option<usize>) -> DbResult<QueryResult>;

    /// End the session on the server.
    async fn close(&self) -> DbResult<()>;

    /// Identifier for logging.
    fn session_id(&self) -> String;
}

/// Shared handle to the live session.
pub type SessionHandle = Arc<dyn Session>;

/// Produces a live session from a validated configuration.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, config: &SnowflakeConfig) -> DbResult<SessionHandle>;
}
