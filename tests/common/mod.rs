//! In-memory Snowflake stand-in shared by the integration tests.
//!
//! `FakeConnector` hands out `FakeSession`s that answer statements through a
//! responder closure and record everything they were asked to run.

#![allow(dead_code)]

use async_trait::async_trait;
use snowflake_mcp_server::db::{
    ConnectionManager, Connector, DEFAULT_REFRESH_INTERVAL, Session, SessionHandle,
};
use snowflake_mcp_server::error::{DbError, DbResult};
use snowflake_mcp_server::models::{AuthType, ColumnMetadata, QueryResult, SnowflakeConfig};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub type Responder = Arc<dyn Fn(&str) -> DbResult<QueryResult> + Send + Sync>;

pub fn test_config() -> SnowflakeConfig {
    SnowflakeConfig::new("test_account", "tester", AuthType::ExternalBrowser, None)
        .expect("valid test config")
}

/// Build a text-typed result from column names and rows.
pub fn result(columns: &[&str], rows: &[&[Option<&str>]]) -> QueryResult {
    QueryResult::new(
        columns
            .iter()
            .map(|name| ColumnMetadata::new(*name, "text", true))
            .collect(),
        rows.iter()
            .map(|row| row.iter().map(|cell| cell.map(str::to_string)).collect())
            .collect(),
    )
}

/// Observes a session without holding a reference to it, so the manager's
/// borrow accounting sees only real borrowers.
pub struct SessionProbe {
    id: String,
    closed: AtomicBool,
}

impl SessionProbe {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

pub struct FakeSession {
    probe: Arc<SessionProbe>,
    responder: Responder,
    executed: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Session for FakeSession {
    async fn execute(&self, sql: &str, max_rows: Option<usize>) -> DbResult<QueryResult> {
        if self.probe.is_closed() {
            return Err(DbError::connection("session is closed", "reconnect"));
        }
        self.executed.lock().unwrap().push(sql.to_string());
        let mut result = (self.responder)(sql)?;
        if let Some(max_rows) = max_rows {
            result.rows.truncate(max_rows);
        }
        Ok(result)
    }

    async fn close(&self) -> DbResult<()> {
        self.probe.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn session_id(&self) -> String {
        self.probe.id.clone()
    }
}

pub struct FakeConnector {
    connects: AtomicUsize,
    fail: AtomicBool,
    delay: Duration,
    responder: Responder,
    sessions: Mutex<Vec<Arc<SessionProbe>>>,
    executed: Arc<Mutex<Vec<String>>>,
}

impl FakeConnector {
    /// Sessions answer every statement with an empty result.
    pub fn new() -> Self {
        Self::with_responder(|_| Ok(QueryResult::default()))
    }

    pub fn with_responder(
        responder: impl Fn(&str) -> DbResult<QueryResult> + Send + Sync + 'static,
    ) -> Self {
        Self {
            connects: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
            delay: Duration::ZERO,
            responder: Arc::new(responder),
            sessions: Mutex::new(Vec::new()),
            executed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Make every connect take `delay` before returning.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Sessions in the order they were opened.
    pub fn sessions(&self) -> Vec<Arc<SessionProbe>> {
        self.sessions.lock().unwrap().clone()
    }

    /// Every statement run on any session, in order.
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, _config: &SnowflakeConfig) -> DbResult<SessionHandle> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let n = self.connects.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail.load(Ordering::SeqCst) {
            return Err(DbError::connection(
                "simulated connect failure",
                "check the fake connector",
            ));
        }
        let probe = Arc::new(SessionProbe {
            id: format!("session-{}", n),
            closed: AtomicBool::new(false),
        });
        self.sessions.lock().unwrap().push(Arc::clone(&probe));
        Ok(Arc::new(FakeSession {
            probe,
            responder: Arc::clone(&self.responder),
            executed: Arc::clone(&self.executed),
        }))
    }
}

/// A manager that connects lazily through `connector`.
pub fn lazy_manager(connector: Arc<FakeConnector>) -> Arc<ConnectionManager> {
    Arc::new(ConnectionManager::with_config(
        connector,
        test_config(),
        DEFAULT_REFRESH_INTERVAL,
    ))
}

/// Answers the catalog statements the tools issue with a small fixed catalog.
pub fn catalog_responder(sql: &str) -> DbResult<QueryResult> {
    let upper = sql.to_uppercase();
    if upper.starts_with("USE ") {
        return Ok(result(&["status"], &[&[Some("Statement executed successfully.")]]));
    }
    if upper.starts_with("SELECT CURRENT_DATABASE(), CURRENT_SCHEMA()") {
        return Ok(result(
            &["CURRENT_DATABASE()", "CURRENT_SCHEMA()"],
            &[&[Some("SALES"), Some("PUBLIC")]],
        ));
    }
    if upper.starts_with("SELECT CURRENT_SCHEMA()") {
        return Ok(result(&["CURRENT_SCHEMA()"], &[&[Some("PUBLIC")]]));
    }
    if upper.starts_with("SHOW DATABASES") {
        return Ok(result(
            &["created_on", "name", "is_default"],
            &[
                &[Some("2024-01-01"), Some("SALES"), Some("N")],
                &[Some("2024-02-01"), Some("MARKETING"), Some("N")],
            ],
        ));
    }
    if upper.starts_with("SHOW VIEWS IN") {
        return Ok(result(
            &["created_on", "name", "reserved", "database_name", "schema_name"],
            &[
                &[Some("2024-03-01 10:00:00"), Some("ORDERS_V"), None, Some("SALES"), Some("PUBLIC")],
                &[Some("2024-03-02 11:30:00"), Some("CUSTOMERS_V"), None, Some("SALES"), Some("PUBLIC")],
            ],
        ));
    }
    if upper.starts_with("DESCRIBE VIEW") {
        return Ok(result(
            &["name", "type", "kind", "null?"],
            &[
                &[Some("ID"), Some("NUMBER(38,0)"), Some("COLUMN"), Some("N")],
                &[Some("NOTE"), Some("VARCHAR(100)"), Some("COLUMN"), Some("Y")],
            ],
        ));
    }
    if upper.starts_with("SELECT GET_DDL") {
        return Ok(result(
            &["GET_DDL"],
            &[&[Some("create view ORDERS_V as select id, note from orders;")]],
        ));
    }
    if upper.starts_with("SELECT * FROM SALES.PUBLIC.EMPTY_V") {
        return Ok(result(&["ID"], &[]));
    }
    if upper.starts_with("SELECT") {
        return Ok(result(
            &["ID", "NOTE"],
            &[
                &[Some("1"), Some("a|b")],
                &[Some("2"), None],
                &[Some("3"), Some("third")],
            ],
        ));
    }
    Err(DbError::database(
        format!("unexpected statement: {}", sql),
        Some("002003".to_string()),
        "",
    ))
}
