//! Snowflake MCP Server - Main entry point.
//!
//! This server provides MCP (Model Context Protocol) tools that let AI
//! assistants explore Snowflake views and run read-only queries.

use snowflake_mcp_server::auth::AuthConfig;
use snowflake_mcp_server::config::{Config, TransportMode};
use snowflake_mcp_server::db::{ConnectionManager, SnowflakeConnector};
use snowflake_mcp_server::error::DbError;
use snowflake_mcp_server::transport::{HttpTransport, StdioTransport, Transport};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
///
/// Logs always go to stderr; stdout belongs to the stdio transport.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Variables from .env behave like real environment variables
    dotenvy::dotenv().ok();

    // Parse configuration from command line and environment
    let config = Config::parse_args();

    // Initialize logging
    init_tracing(&config);

    info!(
        transport = %config.transport,
        "Starting Snowflake MCP Server v{}",
        env!("CARGO_PKG_VERSION")
    );

    let snowflake_config = config.snowflake_config()?;
    let refresh_interval = config.refresh_interval()?;
    let auth_config = AuthConfig::from_tokens(config.auth_tokens.clone())?;

    let connector = SnowflakeConnector::new(
        config.request_timeout_duration(),
        config.login_timeout_duration(),
    )?;
    let connection_manager = Arc::new(ConnectionManager::new(
        Arc::new(connector),
        refresh_interval,
    ));

    info!(
        account = snowflake_config.account(),
        user = snowflake_config.user(),
        auth_type = %snowflake_config.auth_type(),
        refresh_secs = refresh_interval.as_secs(),
        "Connecting to Snowflake"
    );
    match connection_manager.initialize(snowflake_config).await {
        Ok(()) => {
            let status = connection_manager.status().await;
            info!(
                session_id = status.session_id.as_deref().unwrap_or("unknown"),
                "Snowflake connection established"
            );
        }
        Err(e @ DbError::Configuration { .. }) => {
            error!(error = %e, "Invalid Snowflake configuration");
            return Err(e.into());
        }
        // The first tool call retries the connection.
        Err(e) => warn!(error = %e, "Initial Snowflake connection failed"),
    }

    // Run the appropriate transport
    let result = match config.transport {
        TransportMode::Stdio => {
            info!("Using stdio transport");
            let transport = StdioTransport::new(connection_manager);
            transport.run().await
        }
        TransportMode::Http => {
            info!(
                host = %config.http_host,
                port = config.http_port,
                endpoint = %config.mcp_endpoint,
                auth_enabled = auth_config.is_enabled(),
                "Using HTTP transport"
            );
            let transport = HttpTransport::new(
                connection_manager,
                auth_config,
                &config.http_host,
                config.http_port,
                &config.mcp_endpoint,
            );
            transport.run().await
        }
    };

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
