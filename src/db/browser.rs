//! Browser-based single sign-on.
//!
//! Snowflake hands out an identity provider URL bound to a local redirect
//! port. The user signs in through their browser, which then calls back to
//! `http://localhost:<port>` with a one-time token. That token plus the
//! proof key from the first step authenticate the login request.

use crate::db::snowflake::{
    AUTHENTICATOR_BROWSER, ApiResponse, CLIENT_APP_ID, LoginAuth, client_app_version, endpoint,
};
use crate::error::{DbError, DbResult};
use crate::models::SnowflakeConfig;
use axum::Router;
use axum::extract::{Form, Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use url::Url;

const SUCCESS_PAGE: &str = "<!DOCTYPE html><html><head><title>Snowflake MCP Server</title></head>\
<body><p>Your identity was confirmed and propagated to the Snowflake MCP server. You can close this window now.</p></body></html>";

const MISSING_TOKEN_PAGE: &str = "<!DOCTYPE html><html><body><p>Missing token</p></body></html>";

#[derive(Debug, Serialize)]
struct AuthenticatorRequest<'a> {
    data: AuthenticatorData<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct AuthenticatorData<'a> {
    client_app_id: &'a str,
    client_app_version: &'a str,
    account_name: String,
    login_name: &'a str,
    authenticator: &'a str,
    browser_mode_redirect_port: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthenticatorResponseData {
    sso_url: String,
    proof_key: String,
}

/// Run the interactive SSO flow and return the login material.
///
/// Waits at most `timeout` for the browser to call back.
pub(crate) async fn authenticate(
    http: &reqwest::Client,
    base: &Url,
    config: &SnowflakeConfig,
    timeout: Duration,
) -> DbResult<LoginAuth> {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.map_err(|e| {
        DbError::authentication(
            format!("Failed to open local callback port: {}", e),
            "Check that the process may listen on localhost",
        )
    })?;
    let port = listener
        .local_addr()
        .map_err(|e| DbError::internal(format!("Callback listener has no address: {}", e)))?
        .port();

    let body = AuthenticatorRequest {
        data: AuthenticatorData {
            client_app_id: CLIENT_APP_ID,
            client_app_version: client_app_version(),
            account_name: config.account_name(),
            login_name: config.user(),
            authenticator: AUTHENTICATOR_BROWSER,
            browser_mode_redirect_port: port.to_string(),
        },
    };
    let response: ApiResponse<AuthenticatorResponseData> = http
        .post(endpoint(base, "/session/authenticator-request")?)
        .header(reqwest::header::ACCEPT, "application/json")
        .json(&body)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    if !response.success {
        return Err(DbError::authentication(
            format!("Snowflake refused browser authentication: {}", response.message()),
            "Check that the user is set up for single sign-on",
        ));
    }
    let data = response
        .data
        .ok_or_else(|| DbError::internal("Authenticator response carried no SSO URL"))?;

    info!(url = %data.sso_url, "Open this URL to sign in to Snowflake");
    if let Err(e) = open::that(&data.sso_url) {
        warn!(error = %e, "Could not launch a browser; open the sign-in URL manually");
    }

    let token = tokio::time::timeout(timeout, wait_for_token(listener))
        .await
        .map_err(|_| {
            DbError::authentication(
                format!(
                    "Browser sign-in did not complete within {} seconds",
                    timeout.as_secs()
                ),
                "Retry and finish the sign-in in the browser window, or raise SNOWFLAKE_LOGIN_TIMEOUT",
            )
        })??;

    Ok(LoginAuth {
        authenticator: AUTHENTICATOR_BROWSER,
        token,
        proof_key: Some(data.proof_key),
    })
}

#[derive(Debug, Default, Deserialize)]
struct CallbackParams {
    token: Option<String>,
}

/// Hands the first token received back to [`wait_for_token`].
#[derive(Clone)]
struct CallbackState {
    sender: Arc<Mutex<Option<oneshot::Sender<String>>>>,
}

fn callback_router(state: CallbackState) -> Router {
    Router::new()
        .route("/", get(callback_query).post(callback_form))
        .with_state(state)
}

async fn callback_query(
    State(state): State<CallbackState>,
    Query(params): Query<CallbackParams>,
) -> (StatusCode, Html<&'static str>) {
    accept_token(&state, params.token)
}

async fn callback_form(
    State(state): State<CallbackState>,
    Form(params): Form<CallbackParams>,
) -> (StatusCode, Html<&'static str>) {
    accept_token(&state, params.token)
}

fn accept_token(state: &CallbackState, token: Option<String>) -> (StatusCode, Html<&'static str>) {
    let Some(token) = token.filter(|t| !t.is_empty()) else {
        debug!("Callback request carried no token");
        return (StatusCode::BAD_REQUEST, Html(MISSING_TOKEN_PAGE));
    };
    let sender = state.sender.lock().ok().and_then(|mut guard| guard.take());
    match sender {
        Some(sender) => {
            let _ = sender.send(token);
        }
        None => debug!("Ignoring repeated browser callback"),
    }
    (StatusCode::OK, Html(SUCCESS_PAGE))
}

/// Serve the callback route on `listener` until a token arrives.
///
/// The server shuts down once the token is handed over or this future is
/// dropped.
async fn wait_for_token(listener: TcpListener) -> DbResult<String> {
    let (token_tx, token_rx) = oneshot::channel();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let app = callback_router(CallbackState {
        sender: Arc::new(Mutex::new(Some(token_tx))),
    });

    tokio::spawn(async move {
        let shutdown = async {
            let _ = stop_rx.await;
        };
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
        {
            warn!(error = %e, "Browser callback server failed");
        }
    });

    let token = token_rx.await.map_err(|_| {
        DbError::authentication(
            "Browser callback server stopped before sign-in completed",
            "Retry the sign-in",
        )
    })?;
    let _ = stop_tx.send(());
    Ok(token)
}
