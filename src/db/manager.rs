//! Connection lifecycle management.
//!
//! The manager owns the single live Snowflake session. Callers borrow a
//! clone of the handle for one operation. A background task rotates the
//! session once the refresh interval has elapsed.
//!
//! # Concurrency
//!
//! - One `tokio::sync::Mutex` guards configuration, session and refresh
//!   timestamps. Connecting and swapping happen while holding it, so only one
//!   connect attempt runs at a time and callers arriving during a refresh
//!   observe the new session.
//! - The refresh task holds a `Weak` reference; dropping the manager ends it.
//! - Retired sessions are closed outside the lock.

use crate::db::connector::{Connector, SessionHandle};
use crate::error::{DbError, DbResult};
use crate::models::SnowflakeConfig;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Default time between connection refreshes.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(8 * 60 * 60);

/// How often the background task checks whether a refresh is due.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Upper bound on how long a retired session waits for its last borrower.
const RETIRE_GRACE: Duration = Duration::from_secs(300);
const RETIRE_POLL: Duration = Duration::from_secs(1);

#[derive(Default)]
struct ManagerState {
    config: Option<SnowflakeConfig>,
    session: Option<SessionHandle>,
    last_refresh: Option<Instant>,
    last_refresh_at: Option<DateTime<Utc>>,
    closed: bool,
}

/// Point-in-time view of the manager, for logging.
#[derive(Debug, Clone)]
pub struct ConnectionStatus {
    pub initialized: bool,
    pub connected: bool,
    pub closed: bool,
    pub session_id: Option<String>,
    pub last_refresh: Option<DateTime<Utc>>,
    pub refresh_interval: Duration,
}

/// Owns the live session and keeps it fresh.
pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    refresh_interval: Duration,
    check_interval: Duration,
    state: Mutex<ManagerState>,
    /// std mutex: only touched synchronously, never across an await.
    refresh_task: std::sync::Mutex<Option<JoinHandle<()>>>,
    stop_tx: watch::Sender<bool>,
}

impl ConnectionManager {
    /// Create a manager with no configuration. `get_connection` fails until
    /// [`initialize`](Self::initialize) is called.
    pub fn new(connector: Arc<dyn Connector>, refresh_interval: Duration) -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            connector,
            refresh_interval,
            check_interval: DEFAULT_CHECK_INTERVAL,
            state: Mutex::new(ManagerState::default()),
            refresh_task: std::sync::Mutex::new(None),
            stop_tx,
        }
    }

    /// Create a manager that connects lazily on the first `get_connection`.
    pub fn with_config(
        connector: Arc<dyn Connector>,
        config: SnowflakeConfig,
        refresh_interval: Duration,
    ) -> Self {
        let mut manager = Self::new(connector, refresh_interval);
        manager.state.get_mut().config = Some(config);
        manager
    }

    /// Override how often the refresh task wakes up.
    pub fn with_check_interval(mut self, check_interval: Duration) -> Self {
        self.check_interval = check_interval;
        self
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    /// Store `config`, connect, and make sure the refresh task is running.
    ///
    /// Calling again replaces the configuration and reconnects right away.
    /// The previous session is retired once the new one is live.
    pub async fn initialize(self: &Arc<Self>, config: SnowflakeConfig) -> DbResult<()> {
        self.stop_tx.send_replace(false);
        self.ensure_refresh_task();

        let mut state = self.state.lock().await;
        state.closed = false;
        state.config = Some(config.clone());

        let result = self.connector.connect(&config).await;
        let old = match &result {
            Ok(session) => {
                let old = state.session.replace(Arc::clone(session));
                Self::mark_refreshed(&mut state);
                info!(
                    account = %config.account(),
                    session_id = %session.session_id(),
                    refresh_interval_secs = self.refresh_interval.as_secs(),
                    "Connection manager initialized"
                );
                old
            }
            // The old session belongs to the replaced configuration.
            Err(_) => state.session.take(),
        };
        drop(state);

        if let Some(old) = old {
            retire(old).await;
        }
        result.map(|_| ())
    }

    /// Return the live session, connecting on demand when none exists yet.
    pub async fn get_connection(&self) -> DbResult<SessionHandle> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(DbError::connection(
                "Connection manager is closed",
                "Re-initialize the connection manager before running queries",
            ));
        }
        if let Some(session) = &state.session {
            return Ok(Arc::clone(session));
        }

        let config = state.config.clone().ok_or_else(|| {
            DbError::configuration(
                "Connection manager is not initialized: no Snowflake configuration was provided",
            )
        })?;
        debug!("No live session, connecting");
        let session = self.connector.connect(&config).await?;
        state.session = Some(Arc::clone(&session));
        Self::mark_refreshed(&mut state);
        Ok(session)
    }

    /// Reconnect if the refresh interval has elapsed since the last connect.
    ///
    /// Returns whether a new session was swapped in. On failure the current
    /// session keeps serving and the next check tries again.
    pub async fn refresh_if_due(&self) -> bool {
        let mut state = self.state.lock().await;
        if state.closed || state.session.is_none() {
            return false;
        }
        let (Some(config), Some(last_refresh)) = (state.config.clone(), state.last_refresh) else {
            return false;
        };
        let elapsed = last_refresh.elapsed();
        if elapsed < self.refresh_interval {
            return false;
        }

        info!(elapsed_secs = elapsed.as_secs(), "Refreshing Snowflake connection");
        match self.connector.connect(&config).await {
            Ok(session) => {
                let session_id = session.session_id();
                let old = state.session.replace(session);
                Self::mark_refreshed(&mut state);
                drop(state);

                info!(session_id = %session_id, "Snowflake connection refreshed");
                if let Some(old) = old {
                    retire(old).await;
                }
                true
            }
            Err(e) => {
                warn!(error = %e, "Connection refresh failed, keeping the current session");
                false
            }
        }
    }

    /// Stop the refresh task and release the session. Idempotent.
    pub async fn close(&self) {
        self.stop_tx.send_replace(true);

        // Taking the lock waits for an in-flight refresh to settle.
        let session = {
            let mut state = self.state.lock().await;
            state.closed = true;
            state.session.take()
        };

        if let Some(session) = session {
            let session_id = session.session_id();
            match session.close().await {
                Ok(()) => info!(session_id = %session_id, "Snowflake connection closed"),
                Err(e) => debug!(session_id = %session_id, error = %e, "Error closing Snowflake connection"),
            }
        }

        let handle = self
            .refresh_task
            .lock()
            .ok()
            .and_then(|mut guard| guard.take());
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                debug!(error = %e, "Refresh task ended abnormally");
            }
        }
    }

    pub async fn status(&self) -> ConnectionStatus {
        let state = self.state.lock().await;
        ConnectionStatus {
            initialized: state.config.is_some(),
            connected: state.session.is_some(),
            closed: state.closed,
            session_id: state.session.as_ref().map(|s| s.session_id()),
            last_refresh: state.last_refresh_at,
            refresh_interval: self.refresh_interval,
        }
    }

    fn mark_refreshed(state: &mut ManagerState) {
        state.last_refresh = Some(Instant::now());
        state.last_refresh_at = Some(Utc::now());
    }

    fn ensure_refresh_task(self: &Arc<Self>) {
        let Ok(mut guard) = self.refresh_task.lock() else {
            warn!("Refresh task handle is poisoned, not starting refresh task");
            return;
        };
        if guard.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        let weak = Arc::downgrade(self);
        let stop_rx = self.stop_tx.subscribe();
        let check_interval = self.check_interval;
        *guard = Some(tokio::spawn(async move {
            Self::refresh_loop(weak, check_interval, stop_rx).await;
        }));
        debug!(check_interval_secs = check_interval.as_secs(), "Refresh task started");
    }

    async fn refresh_loop(
        weak: Weak<Self>,
        check_interval: Duration,
        mut stop_rx: watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval_at(Instant::now() + check_interval, check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                changed = stop_rx.changed() => {
                    if changed.is_err() || *stop_rx.borrow() {
                        debug!("Refresh task stopping");
                        return;
                    }
                }
                _ = ticker.tick() => {
                    let Some(manager) = weak.upgrade() else {
                        debug!("Connection manager dropped, refresh task exiting");
                        return;
                    };
                    manager.refresh_if_due().await;
                    // Release before sleeping so the manager can be dropped.
                    drop(manager);
                }
            }
        }
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("refresh_interval", &self.refresh_interval)
            .field("check_interval", &self.check_interval)
            .finish()
    }
}

/// Close a replaced session once nobody borrows it any more.
async fn retire(session: SessionHandle) {
    if Arc::strong_count(&session) == 1 {
        close_retired(session).await;
        return;
    }

    tokio::spawn(async move {
        let deadline = Instant::now() + RETIRE_GRACE;
        while Arc::strong_count(&session) > 1 && Instant::now() < deadline {
            tokio::time::sleep(RETIRE_POLL).await;
        }
        close_retired(session).await;
    });
}

async fn close_retired(session: SessionHandle) {
    let session_id = session.session_id();
    match session.close().await {
        Ok(()) => debug!(session_id = %session_id, "Retired session closed"),
        Err(e) => debug!(session_id = %session_id, error = %e, "Error closing retired session"),
    }
}
