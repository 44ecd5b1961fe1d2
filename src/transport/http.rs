//! HTTP transport with Streamable HTTP support for the MCP server.
//!
//! This transport serves MCP over HTTP with SSE streaming responses.
//! When bearer tokens are configured every request must present one.

use crate::auth::{AuthConfig, auth_middleware};
use crate::db::ConnectionManager;
use crate::error::{DbError, DbResult};
use crate::mcp::SnowflakeService;
use crate::transport::{Transport, wait_for_signal};
use rmcp::transport::streamable_http_server::{
    StreamableHttpService, session::local::LocalSessionManager,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// How long open SSE streams may delay shutdown.
const GRACEFUL_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP transport implementation with Streamable HTTP support.
pub struct HttpTransport {
    connection_manager: Arc<ConnectionManager>,
    auth_config: Arc<AuthConfig>,
    host: String,
    port: u16,
    /// MCP endpoint path
    endpoint: String,
}

impl HttpTransport {
    /// Create a new HTTP transport.
    ///
    /// # Arguments
    ///
    /// * `connection_manager` - Shared connection manager owning the Snowflake session
    /// * `auth_config` - Bearer tokens accepted on the endpoint (disabled when empty)
    /// * `host` - Host address to bind to
    /// * `port` - Port to bind to
    /// * `endpoint` - MCP endpoint path (e.g., "/mcp")
    pub fn new(
        connection_manager: Arc<ConnectionManager>,
        auth_config: AuthConfig,
        host: impl Into<String>,
        port: u16,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            connection_manager,
            auth_config: Arc::new(auth_config),
            host: host.into(),
            port,
            endpoint: endpoint.into(),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn router(&self) -> axum::Router {
        let connection_manager = self.connection_manager.clone();
        let service = StreamableHttpService::new(
            move || Ok(SnowflakeService::new(connection_manager.clone())),
            LocalSessionManager::default().into(),
            Default::default(),
        );

        // nest_service rejects "/", so the root endpoint uses a fallback.
        let app = if self.endpoint == "/" {
            axum::Router::new().fallback_service(service)
        } else {
            axum::Router::new().nest_service(&self.endpoint, service)
        };

        if self.auth_config.is_enabled() {
            info!(
                token_count = self.auth_config.token_count(),
                "Bearer token authentication enabled"
            );
            app.layer(axum::middleware::from_fn_with_state(
                self.auth_config.clone(),
                auth_middleware,
            ))
        } else {
            app
        }
    }
}

impl Transport for HttpTransport {
    async fn run(&self) -> DbResult<()> {
        let bind_addr = self.bind_addr();
        info!("Starting MCP server with HTTP transport on {}", bind_addr);

        let app = self.router();
        let listener = TcpListener::bind(&bind_addr).await.map_err(|e| {
            DbError::connection(
                format!("Failed to bind to {}: {}", bind_addr, e),
                "Check that the port is available",
            )
        })?;
        info!(endpoint = %self.endpoint, "MCP endpoint ready");

        let shutdown_notify = Arc::new(tokio::sync::Notify::new());
        let shutdown_notify_clone = shutdown_notify.clone();
        let shutdown_signal = async move {
            wait_for_signal().await;
            shutdown_notify_clone.notify_one();
        };

        let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal);

        let mut result = Ok(());
        tokio::select! {
            served = server => {
                match served {
                    Ok(()) => info!("HTTP server stopped"),
                    Err(e) => {
                        error!(error = %e, "HTTP server error");
                        result = Err(DbError::internal(format!("HTTP server error: {}", e)));
                    }
                }
            }
            _ = async {
                shutdown_notify.notified().await;
                info!(
                    timeout_secs = GRACEFUL_TIMEOUT.as_secs(),
                    "Waiting for connections to close (send signal again to force exit)..."
                );
                tokio::select! {
                    _ = tokio::time::sleep(GRACEFUL_TIMEOUT) => {
                        warn!("Graceful shutdown timeout, forcing exit");
                    }
                    _ = wait_for_signal() => {
                        warn!("Received second signal, forcing immediate exit");
                    }
                }
            } => {}
        }

        info!("Closing Snowflake connection");
        self.connection_manager.close().await;
        result
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{DEFAULT_REFRESH_INTERVAL, SnowflakeConnector};

    fn manager() -> Arc<ConnectionManager> {
        let connector = SnowflakeConnector::new(Duration::from_secs(5), Duration::from_secs(5))
            .unwrap();
        Arc::new(ConnectionManager::new(
            Arc::new(connector),
            DEFAULT_REFRESH_INTERVAL,
        ))
    }

    #[test]
    fn test_http_transport_creation() {
        let transport =
            HttpTransport::new(manager(), AuthConfig::disabled(), "127.0.0.1", 8000, "/mcp");
        assert_eq!(transport.name(), "http");
        assert_eq!(transport.bind_addr(), "127.0.0.1:8000");
        assert_eq!(transport.endpoint(), "/mcp");
    }

    #[tokio::test]
    async fn test_router_builds_for_root_and_nested_endpoints() {
        let auth = AuthConfig::from_tokens(vec!["secret".into()]).unwrap();
        for endpoint in ["/", "/snowflake"] {
            let transport = HttpTransport::new(manager(), auth.clone(), "127.0.0.1", 0, endpoint);
            let _router = transport.router();
        }
    }
}
