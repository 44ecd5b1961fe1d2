//! MCP service implementation using rmcp.
//!
//! This module defines the SnowflakeService struct with the five Snowflake
//! tools exposed via the MCP protocol using the rmcp framework's macros.
//! Every tool answers with a text block; failures come back as a tool error
//! whose text starts with `Error: `.

use crate::db::ConnectionManager;
use crate::error::DbResult;
use crate::tools::catalog::{
    CatalogToolHandler, DescribeViewInput, ListViewsInput, QueryViewInput,
};
use crate::tools::query::{ExecuteQueryInput, QueryToolHandler};
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{
        CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    tool, tool_handler, tool_router,
};
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub struct SnowflakeService {
    /// Shared connection manager for all Snowflake operations
    connection_manager: Arc<ConnectionManager>,
    /// Tool router for MCP tool dispatch (auto-generated)
    tool_router: ToolRouter<Self>,
}

impl SnowflakeService {
    /// Create a new SnowflakeService instance.
    ///
    /// # Arguments
    ///
    /// * `connection_manager` - Shared connection manager owning the Snowflake session
    pub fn new(connection_manager: Arc<ConnectionManager>) -> Self {
        Self {
            connection_manager,
            tool_router: Self::tool_router(),
        }
    }

    fn catalog(&self) -> CatalogToolHandler {
        CatalogToolHandler::new(self.connection_manager.clone())
    }
}

/// Convert a handler outcome into the text block returned to the client.
fn to_call_result(tool: &str, result: DbResult<String>) -> Result<CallToolResult, McpError> {
    match result {
        Ok(text) => Ok(CallToolResult::success(vec![Content::text(text)])),
        Err(e) => {
            warn!(tool, error = %e, "Tool call failed");
            Ok(CallToolResult::error(vec![Content::text(e.to_tool_text())]))
        }
    }
}

#[tool_router]
impl SnowflakeService {
    #[tool(description = "List all accessible Snowflake databases.")]
    async fn list_databases(&self) -> Result<CallToolResult, McpError> {
        to_call_result("list_databases", self.catalog().list_databases().await)
    }

    #[tool(
        description = "List all views in a specified database and schema.\nSchema defaults to the session's current schema."
    )]
    async fn list_views(
        &self,
        Parameters(input): Parameters<ListViewsInput>,
    ) -> Result<CallToolResult, McpError> {
        to_call_result("list_views", self.catalog().list_views(input).await)
    }

    #[tool(
        description = "Get detailed information about a specific view including columns and SQL definition."
    )]
    async fn describe_view(
        &self,
        Parameters(input): Parameters<DescribeViewInput>,
    ) -> Result<CallToolResult, McpError> {
        to_call_result("describe_view", self.catalog().describe_view(input).await)
    }

    #[tool(description = "Query data from a view with an optional row limit (default 10).")]
    async fn query_view(
        &self,
        Parameters(input): Parameters<QueryViewInput>,
    ) -> Result<CallToolResult, McpError> {
        to_call_result("query_view", self.catalog().query_view(input).await)
    }

    #[tool(
        description = "Execute a read-only SQL query against Snowflake.\nOnly SELECT, SHOW, DESCRIBE, EXPLAIN and WITH statements are allowed.\nA LIMIT clause (default 100) is appended when the query has none."
    )]
    async fn execute_query(
        &self,
        Parameters(input): Parameters<ExecuteQueryInput>,
    ) -> Result<CallToolResult, McpError> {
        let handler = QueryToolHandler::new(self.connection_manager.clone());
        to_call_result("execute_query", handler.execute_query(input).await)
    }
}

#[tool_handler]
impl ServerHandler for SnowflakeService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "snowflake-mcp-server".to_owned(),
                title: Some("Snowflake MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "MCP server for performing read-only operations against Snowflake.\n\
                \n\
                ## Workflow\n\
                1. Call `list_databases` to see what is accessible\n\
                2. Call `list_views` with a database (and optionally a schema)\n\
                3. Use `describe_view` and `query_view` to inspect a view\n\
                4. Use `execute_query` for ad-hoc read-only SQL\n\
                \n\
                Only SELECT, SHOW, DESCRIBE, EXPLAIN and WITH statements are accepted."
                    .to_string(),
            ),
        }
    }
}
