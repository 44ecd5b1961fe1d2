//! Configuration handling for the Snowflake MCP Server.
//!
//! This module provides configuration management via CLI arguments and
//! environment variables. `main` loads a `.env` file first, so variables
//! defined there behave like real environment variables.

use crate::db::snowflake::{DEFAULT_LOGIN_TIMEOUT_SECS, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::error::{DbError, DbResult};
use crate::models::{AuthType, SnowflakeConfig};
use clap::{Parser, ValueEnum};
use std::time::Duration;

pub const DEFAULT_HTTP_HOST: &str = "127.0.0.1";
pub const DEFAULT_HTTP_PORT: u16 = 8000;
pub const DEFAULT_MCP_ENDPOINT: &str = "/";
pub const DEFAULT_REFRESH_HOURS: f64 = 8.0;

/// Transport mode for the MCP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TransportMode {
    /// Standard input/output (for CLI integration)
    #[default]
    Stdio,
    /// Streamable HTTP (for web clients)
    Http,
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdio => write!(f, "stdio"),
            Self::Http => write!(f, "http"),
        }
    }
}

/// Configuration for the Snowflake MCP Server.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "snowflake-mcp-server",
    about = "MCP server for read-only Snowflake operations - lets AI assistants explore views and run SELECT queries",
    version,
    author
)]
pub struct Config {
    /// Snowflake account identifier (e.g. xy12345.us-east-1)
    #[arg(long, env = "SNOWFLAKE_ACCOUNT")]
    pub account: Option<String>,

    /// Snowflake user name
    #[arg(long, env = "SNOWFLAKE_USER")]
    pub user: Option<String>,

    /// Authentication mode
    #[arg(
        long,
        value_enum,
        default_value = "private_key",
        env = "SNOWFLAKE_AUTH_TYPE"
    )]
    pub auth_type: AuthType,

    /// Path to an unencrypted PEM RSA private key (required for private_key auth)
    #[arg(long, env = "SNOWFLAKE_PRIVATE_KEY_PATH")]
    pub private_key_path: Option<String>,

    /// Default warehouse for the session
    #[arg(long, env = "SNOWFLAKE_WAREHOUSE")]
    pub warehouse: Option<String>,

    /// Default database for the session
    #[arg(long, env = "SNOWFLAKE_DATABASE")]
    pub database: Option<String>,

    /// Default schema for the session
    #[arg(long, env = "SNOWFLAKE_SCHEMA")]
    pub schema: Option<String>,

    /// Role to assume for the session
    #[arg(long, env = "SNOWFLAKE_ROLE")]
    pub role: Option<String>,

    /// Override the account host (defaults to <account>.snowflakecomputing.com)
    #[arg(long, env = "SNOWFLAKE_HOST")]
    pub host: Option<String>,

    /// Hours between connection refreshes
    #[arg(
        long,
        default_value_t = DEFAULT_REFRESH_HOURS,
        env = "SNOWFLAKE_CONN_REFRESH_HOURS"
    )]
    pub refresh_hours: f64,

    /// Timeout for each Snowflake HTTP request in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS,
        env = "SNOWFLAKE_REQUEST_TIMEOUT"
    )]
    pub request_timeout: u64,

    /// How long browser authentication waits for the sign-in, in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_LOGIN_TIMEOUT_SECS,
        env = "SNOWFLAKE_LOGIN_TIMEOUT"
    )]
    pub login_timeout: u64,

    /// Transport mode (stdio or http)
    #[arg(
        short,
        long,
        value_enum,
        default_value = "stdio",
        env = "MCP_TRANSPORT"
    )]
    pub transport: TransportMode,

    /// HTTP host to bind to (only used with http transport)
    #[arg(long, default_value = DEFAULT_HTTP_HOST, env = "MCP_HTTP_HOST")]
    pub http_host: String,

    /// HTTP port to bind to (only used with http transport)
    #[arg(long, default_value_t = DEFAULT_HTTP_PORT, env = "MCP_HTTP_PORT")]
    pub http_port: u16,

    /// MCP endpoint path (only used with http transport)
    #[arg(long, default_value = DEFAULT_MCP_ENDPOINT, env = "MCP_ENDPOINT")]
    pub mcp_endpoint: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "MCP_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "MCP_JSON_LOGS")]
    pub json_logs: bool,

    /// Authentication tokens for HTTP transport.
    /// Can be specified multiple times or as comma-separated values.
    /// When set, all HTTP requests must include a valid Bearer token.
    #[arg(
        long = "auth-token",
        value_name = "TOKEN",
        env = "MCP_AUTH_TOKENS",
        value_delimiter = ','
    )]
    pub auth_tokens: Vec<String>,
}

impl Config {
    /// Parse configuration from command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            account: None,
            user: None,
            auth_type: AuthType::PrivateKey,
            private_key_path: None,
            warehouse: None,
            database: None,
            schema: None,
            role: None,
            host: None,
            refresh_hours: DEFAULT_REFRESH_HOURS,
            request_timeout: DEFAULT_REQUEST_TIMEOUT_SECS,
            login_timeout: DEFAULT_LOGIN_TIMEOUT_SECS,
            transport: TransportMode::Stdio,
            http_host: DEFAULT_HTTP_HOST.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            mcp_endpoint: DEFAULT_MCP_ENDPOINT.to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            auth_tokens: Vec::new(),
        }
    }

    /// Build the validated Snowflake connection configuration.
    pub fn snowflake_config(&self) -> DbResult<SnowflakeConfig> {
        Ok(SnowflakeConfig::new(
            self.account.clone().unwrap_or_default(),
            self.user.clone().unwrap_or_default(),
            self.auth_type,
            self.private_key_path.clone(),
        )?
        .with_warehouse(self.warehouse.clone())
        .with_database(self.database.clone())
        .with_schema(self.schema.clone())
        .with_role(self.role.clone())
        .with_host(self.host.clone()))
    }

    /// Refresh interval; hours must be positive and finite.
    pub fn refresh_interval(&self) -> DbResult<Duration> {
        let invalid = || {
            DbError::configuration(format!(
                "SNOWFLAKE_CONN_REFRESH_HOURS must be a positive number of hours, got {}",
                self.refresh_hours
            ))
        };
        if !self.refresh_hours.is_finite() || self.refresh_hours <= 0.0 {
            return Err(invalid());
        }
        Duration::try_from_secs_f64(self.refresh_hours * 3600.0).map_err(|_| invalid())
    }

    /// Get the HTTP bind address.
    pub fn http_bind_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }

    pub fn request_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn login_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.login_timeout)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}
