//! Snowflake session client.
//!
//! Speaks the REST session protocol used by the official connectors:
//! `login-request` to open a session, `query-request` to run statements,
//! `token-request` to renew an expired session token, and `session?delete`
//! to end the session. Results are requested in JSON format so every cell
//! arrives as text.

use crate::db::browser;
use crate::db::connector::{Connector, Session, SessionHandle};
use crate::db::credentials::{Credential, load_credential};
use crate::error::{DbError, DbResult};
use crate::models::{AuthType, Cell, ColumnMetadata, QueryResult, SnowflakeConfig};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

pub const CLIENT_APP_ID: &str = "snowflake-mcp-server";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_LOGIN_TIMEOUT_SECS: u64 = 120;

pub(crate) const AUTHENTICATOR_JWT: &str = "SNOWFLAKE_JWT";
pub(crate) const AUTHENTICATOR_BROWSER: &str = "EXTERNALBROWSER";

const SNOWFLAKE_ACCEPT: &str = "application/snowflake";
const QUERY_IN_PROGRESS: &str = "333333";
const QUERY_IN_PROGRESS_ASYNC: &str = "333334";
const SESSION_EXPIRED: &str = "390112";
const RESULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

pub(crate) fn client_app_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Common envelope of every Snowflake session API response.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiResponse<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<JsonValue>,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Error code as text; Snowflake sends it either as a string or a number.
    pub fn code(&self) -> Option<String> {
        match self.code.as_ref()? {
            JsonValue::String(s) => Some(s.clone()),
            JsonValue::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn message(&self) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| "no message returned".to_string())
    }
}

/// Authenticator-specific part of a login request.
#[derive(Debug)]
pub(crate) struct LoginAuth {
    pub authenticator: &'static str,
    pub token: String,
    pub proof_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    data: LoginData<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct LoginData<'a> {
    client_app_id: &'a str,
    client_app_version: &'a str,
    account_name: String,
    login_name: &'a str,
    authenticator: &'a str,
    token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    proof_key: Option<&'a str>,
    session_parameters: HashMap<&'static str, &'static str>,
}

impl<'a> LoginData<'a> {
    fn new(config: &'a SnowflakeConfig, auth: &'a LoginAuth) -> Self {
        Self {
            client_app_id: CLIENT_APP_ID,
            client_app_version: client_app_version(),
            account_name: config.account_name(),
            login_name: config.user(),
            authenticator: auth.authenticator,
            token: &auth.token,
            proof_key: auth.proof_key.as_deref(),
            session_parameters: HashMap::from([("QUERY_RESULT_FORMAT", "JSON")]),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponseData {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    master_token: Option<String>,
    #[serde(default)]
    session_id: Option<JsonValue>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    sql_text: &'a str,
    async_exec: bool,
    sequence_id: u64,
    query_submission_time: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponseData {
    #[serde(default)]
    rowtype: Vec<RowType>,
    #[serde(default)]
    rowset: Vec<Vec<JsonValue>>,
    #[serde(default)]
    chunks: Vec<ChunkInfo>,
    #[serde(default)]
    chunk_headers: Option<HashMap<String, String>>,
    #[serde(default)]
    qrmk: Option<String>,
    #[serde(default)]
    get_result_url: Option<String>,
    #[serde(default)]
    query_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RowType {
    name: String,
    #[serde(rename = "type", default)]
    type_name: String,
    #[serde(default)]
    nullable: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChunkInfo {
    url: String,
    #[serde(default)]
    row_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RenewRequest<'a> {
    old_session_token: &'a str,
    request_type: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenewResponseData {
    session_token: String,
    #[serde(default)]
    master_token: Option<String>,
}

/// Root URL of the account endpoint. A host override may carry its own scheme.
pub fn base_url(config: &SnowflakeConfig) -> DbResult<Url> {
    let host = config.host();
    let raw = if host.starts_with("http://") || host.starts_with("https://") {
        host
    } else {
        format!("https://{}", host)
    };
    Url::parse(&raw)
        .map_err(|e| DbError::configuration(format!("Invalid Snowflake host '{}': {}", raw, e)))
}

pub(crate) fn endpoint(base: &Url, path: &str) -> DbResult<Url> {
    base.join(path)
        .map_err(|e| DbError::internal(format!("Invalid Snowflake URL '{}': {}", path, e)))
}

/// Login URL carrying session defaults. Optional fields that are not
/// configured are left out entirely.
pub fn login_url(base: &Url, config: &SnowflakeConfig, request_id: &str) -> DbResult<Url> {
    let mut url = endpoint(base, "/session/v1/login-request")?;
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("request_id", request_id);
        if let Some(warehouse) = config.warehouse() {
            pairs.append_pair("warehouse", warehouse);
        }
        if let Some(database) = config.database() {
            pairs.append_pair("databaseName", database);
        }
        if let Some(schema) = config.schema() {
            pairs.append_pair("schemaName", schema);
        }
        if let Some(role) = config.role() {
            pairs.append_pair("roleName", role);
        }
    }
    Ok(url)
}

/// Parse a downloaded result chunk. Chunks hold comma-separated JSON row
/// arrays without the enclosing brackets.
pub fn parse_chunk(body: &str) -> DbResult<Vec<Vec<Cell>>> {
    let wrapped = format!("[{}]", body.trim().trim_end_matches(','));
    let rows: Vec<Vec<JsonValue>> = serde_json::from_str(&wrapped)
        .map_err(|e| DbError::internal(format!("Malformed result chunk: {}", e)))?;
    Ok(rows.into_iter().map(to_cells).collect())
}

fn to_cells(row: Vec<JsonValue>) -> Vec<Cell> {
    row.into_iter()
        .map(|value| match value {
            JsonValue::Null => None,
            JsonValue::String(s) => Some(s),
            other => Some(other.to_string()),
        })
        .collect()
}

fn chunk_headers(data: &QueryResponseData) -> DbResult<HeaderMap> {
    let invalid = |e: String| DbError::internal(format!("Invalid chunk header: {}", e));
    let mut headers = HeaderMap::new();
    if let Some(map) = &data.chunk_headers {
        for (name, value) in map {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(e.to_string()))?;
            let value = HeaderValue::from_str(value).map_err(|e| invalid(e.to_string()))?;
            headers.insert(name, value);
        }
    } else if let Some(qrmk) = &data.qrmk {
        headers.insert(
            "x-amz-server-side-encryption-customer-algorithm",
            HeaderValue::from_static("AES256"),
        );
        headers.insert(
            "x-amz-server-side-encryption-customer-key",
            HeaderValue::from_str(qrmk).map_err(|e| invalid(e.to_string()))?,
        );
    }
    Ok(headers)
}

/// Connection factory backed by the Snowflake REST session API.
#[derive(Debug, Clone)]
pub struct SnowflakeConnector {
    http: reqwest::Client,
    login_timeout: Duration,
}

impl SnowflakeConnector {
    /// Create a connector.
    ///
    /// # Arguments
    ///
    /// * `request_timeout` - Upper bound for every HTTP request, including query execution
    /// * `login_timeout` - How long browser authentication waits for the user
    pub fn new(request_timeout: Duration, login_timeout: Duration) -> DbResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(format!("{}/{}", CLIENT_APP_ID, client_app_version()))
            .build()
            .map_err(|e| DbError::internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            login_timeout,
        })
    }

    async fn login(
        &self,
        base: &Url,
        config: &SnowflakeConfig,
        auth: LoginAuth,
    ) -> DbResult<SnowflakeSession> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let url = login_url(base, config, &request_id)?;
        let body = LoginRequest {
            data: LoginData::new(config, &auth),
        };

        let response: ApiResponse<LoginResponseData> = self
            .http
            .post(url)
            .header(ACCEPT, "application/json")
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !response.success {
            let suggestion = match config.auth_type() {
                AuthType::PrivateKey => {
                    "Check that the public key is registered for the user (ALTER USER ... SET RSA_PUBLIC_KEY)"
                }
                AuthType::ExternalBrowser => {
                    "Complete the browser sign-in with the configured user"
                }
            };
            let code = response.code().unwrap_or_default();
            return Err(DbError::authentication(
                format!("Snowflake rejected the login ({}): {}", code, response.message()),
                suggestion,
            ));
        }

        let data = response
            .data
            .ok_or_else(|| DbError::internal("Login response carried no session data"))?;
        let token = data
            .token
            .ok_or_else(|| DbError::internal("Login response carried no session token"))?;
        let session_id = match data.session_id {
            Some(JsonValue::String(s)) => s,
            Some(other) => other.to_string(),
            None => request_id,
        };

        Ok(SnowflakeSession {
            http: self.http.clone(),
            base_url: base.clone(),
            tokens: RwLock::new(SessionTokens {
                session: token,
                master: data.master_token,
            }),
            session_id,
            sequence: AtomicU64::new(0),
        })
    }
}

#[async_trait]
impl Connector for SnowflakeConnector {
    async fn connect(&self, config: &SnowflakeConfig) -> DbResult<SessionHandle> {
        let base = base_url(config)?;
        let auth = match load_credential(config)? {
            Credential::KeyPair(key) => LoginAuth {
                authenticator: AUTHENTICATOR_JWT,
                token: key.sign_login_token(&config.account_name(), config.user())?,
                proof_key: None,
            },
            Credential::ExternalBrowser => {
                browser::authenticate(&self.http, &base, config, self.login_timeout).await?
            }
        };

        info!(
            account = %config.account(),
            user = %config.user(),
            auth_type = %config.auth_type(),
            "Logging in to Snowflake"
        );
        let session = self.login(&base, config, auth).await?;
        info!(session_id = %session.session_id, "Snowflake session established");
        Ok(Arc::new(session))
    }
}

struct SessionTokens {
    session: String,
    master: Option<String>,
}

/// A live Snowflake session.
pub struct SnowflakeSession {
    http: reqwest::Client,
    base_url: Url,
    tokens: RwLock<SessionTokens>,
    session_id: String,
    sequence: AtomicU64,
}

impl SnowflakeSession {
    fn authorization(token: &str) -> String {
        format!("Snowflake Token=\"{}\"", token)
    }

    async fn session_token(&self) -> String {
        self.tokens.read().await.session.clone()
    }

    async fn post_api<B: Serialize, T: DeserializeOwned>(
        &self,
        url: Url,
        body: Option<&B>,
    ) -> DbResult<ApiResponse<T>> {
        let mut request = self
            .http
            .post(url)
            .header(AUTHORIZATION, Self::authorization(&self.session_token().await))
            .header(ACCEPT, SNOWFLAKE_ACCEPT);
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?.error_for_status()?.json().await?)
    }

    async fn post_query(&self, sql: &str) -> DbResult<ApiResponse<QueryResponseData>> {
        let mut url = endpoint(&self.base_url, "/queries/v1/query-request")?;
        url.query_pairs_mut()
            .append_pair("requestId", &uuid::Uuid::new_v4().to_string());
        let body = QueryRequest {
            sql_text: sql,
            async_exec: false,
            sequence_id: self.sequence.fetch_add(1, Ordering::Relaxed) + 1,
            query_submission_time: chrono::Utc::now().timestamp_millis(),
        };
        self.post_api(url, Some(&body)).await
    }

    /// Exchange the master token for a fresh session token.
    async fn renew(&self) -> DbResult<()> {
        let mut tokens = self.tokens.write().await;
        let master = tokens.master.clone().ok_or_else(|| {
            DbError::connection(
                "Session expired and no master token is available",
                "Reconnect to Snowflake",
            )
        })?;

        let mut url = endpoint(&self.base_url, "/session/token-request")?;
        url.query_pairs_mut()
            .append_pair("requestId", &uuid::Uuid::new_v4().to_string());
        let body = RenewRequest {
            old_session_token: &tokens.session,
            request_type: "RENEW",
        };
        let response: ApiResponse<RenewResponseData> = self
            .http
            .post(url)
            .header(AUTHORIZATION, Self::authorization(&master))
            .header(ACCEPT, SNOWFLAKE_ACCEPT)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !response.success {
            return Err(DbError::connection(
                format!("Failed to renew session token: {}", response.message()),
                "Reconnect to Snowflake",
            ));
        }
        let data = response
            .data
            .ok_or_else(|| DbError::internal("Token renewal carried no data"))?;
        tokens.session = data.session_token;
        if data.master_token.is_some() {
            tokens.master = data.master_token;
        }
        info!(session_id = %self.session_id, "Snowflake session token renewed");
        Ok(())
    }

    async fn submit(&self, sql: &str) -> DbResult<QueryResponseData> {
        let mut response = self.post_query(sql).await?;
        if response.code().as_deref() == Some(SESSION_EXPIRED) {
            self.renew().await?;
            response = self.post_query(sql).await?;
        }

        while matches!(
            response.code().as_deref(),
            Some(QUERY_IN_PROGRESS) | Some(QUERY_IN_PROGRESS_ASYNC)
        ) {
            let result_path = response
                .data
                .as_ref()
                .and_then(|d| d.get_result_url.clone())
                .ok_or_else(|| DbError::internal("Query is still running but no result URL was returned"))?;
            tokio::time::sleep(RESULT_POLL_INTERVAL).await;

            let url = endpoint(&self.base_url, &result_path)?;
            response = self
                .http
                .get(url)
                .header(AUTHORIZATION, Self::authorization(&self.session_token().await))
                .header(ACCEPT, SNOWFLAKE_ACCEPT)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
        }

        if !response.success {
            return Err(DbError::database(
                response.message(),
                response.code(),
                "Check the SQL syntax and that the referenced objects exist and are granted to the current role",
            ));
        }
        response
            .data
            .ok_or_else(|| DbError::internal("Snowflake returned no result data"))
    }

    async fn fetch_chunk(&self, chunk: &ChunkInfo, headers: &HeaderMap) -> DbResult<Vec<Vec<Cell>>> {
        let body = self
            .http
            .get(&chunk.url)
            .headers(headers.clone())
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_chunk(&body)
    }
}

#[async_trait]
impl Session for SnowflakeSession {
    async fn execute(&self, sql: &str, max_rows: Option<usize>) -> DbResult<QueryResult> {
        let start = Instant::now();
        let cap = max_rows.unwrap_or(usize::MAX);
        let mut data = self.submit(sql).await?;

        let columns: Vec<ColumnMetadata> = data
            .rowtype
            .iter()
            .map(|c| ColumnMetadata::new(&c.name, &c.type_name, c.nullable))
            .collect();
        let mut rows: Vec<Vec<Cell>> = std::mem::take(&mut data.rowset)
            .into_iter()
            .map(to_cells)
            .collect();

        if rows.len() < cap && !data.chunks.is_empty() {
            let headers = chunk_headers(&data)?;
            for chunk in &data.chunks {
                if rows.len() >= cap {
                    break;
                }
                debug!(rows = chunk.row_count, "Downloading result chunk");
                rows.extend(self.fetch_chunk(chunk, &headers).await?);
            }
        }
        rows.truncate(cap);

        let execution_time_ms = start.elapsed().as_millis() as u64;
        debug!(
            session_id = %self.session_id,
            query_id = data.query_id.as_deref().unwrap_or("unknown"),
            row_count = rows.len(),
            execution_time_ms = execution_time_ms,
            "Statement executed"
        );

        Ok(QueryResult {
            columns,
            rows,
            execution_time_ms,
        })
    }

    async fn close(&self) -> DbResult<()> {
        let mut url = endpoint(&self.base_url, "/session")?;
        url.query_pairs_mut().append_pair("delete", "true");
        let response: ApiResponse<JsonValue> = self.post_api::<(), _>(url, None).await?;
        if !response.success {
            warn!(session_id = %self.session_id, code = ?response.code(), "Snowflake refused to close session");
            return Err(DbError::connection(
                format!("Failed to close session: {}", response.message()),
                "The session will expire on its own",
            ));
        }
        info!(session_id = %self.session_id, "Snowflake session closed");
        Ok(())
    }

    fn session_id(&self) -> String {
        self.session_id.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SnowflakeConfig {
        SnowflakeConfig::new(
            "xy12345.us-east-1",
            "analyst",
            AuthType::PrivateKey,
            Some("/keys/rsa_key.p8".into()),
        )
        .unwrap()
    }

    fn query_keys(url: &Url) -> Vec<String> {
        url.query_pairs().map(|(k, _)| k.into_owned()).collect()
    }

    #[test]
    fn test_base_url_default_host() {
        let url = base_url(&config()).unwrap();
        assert_eq!(
            url.as_str(),
            "https://xy12345.us-east-1.snowflakecomputing.com/"
        );
    }

    #[test]
    fn test_base_url_override_keeps_scheme() {
        let config = config().with_host(Some("http://127.0.0.1:9000".into()));
        assert_eq!(base_url(&config).unwrap().as_str(), "http://127.0.0.1:9000/");
    }

    #[test]
    fn test_login_url_omits_absent_optionals() {
        let base = base_url(&config()).unwrap();
        let url = login_url(&base, &config(), "req-1").unwrap();
        assert_eq!(url.path(), "/session/v1/login-request");
        assert_eq!(query_keys(&url), vec!["request_id"]);
    }

    #[test]
    fn test_login_url_includes_present_optionals() {
        let config = config()
            .with_warehouse(Some("COMPUTE_WH".into()))
            .with_database(Some("ANALYTICS".into()))
            .with_schema(Some("PUBLIC".into()))
            .with_role(Some("REPORTER".into()));
        let base = base_url(&config).unwrap();
        let url = login_url(&base, &config, "req-1").unwrap();
        let pairs: HashMap<String, String> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["warehouse"], "COMPUTE_WH");
        assert_eq!(pairs["databaseName"], "ANALYTICS");
        assert_eq!(pairs["schemaName"], "PUBLIC");
        assert_eq!(pairs["roleName"], "REPORTER");
    }

    #[test]
    fn test_login_url_with_only_role() {
        let config = config().with_role(Some("REPORTER".into()));
        let base = base_url(&config).unwrap();
        let url = login_url(&base, &config, "req-1").unwrap();
        assert_eq!(query_keys(&url), vec!["request_id", "roleName"]);
    }

    #[test]
    fn test_login_body_for_key_pair() {
        let config = config();
        let auth = LoginAuth {
            authenticator: AUTHENTICATOR_JWT,
            token: "jwt-token".into(),
            proof_key: None,
        };
        let body = serde_json::to_value(LoginRequest {
            data: LoginData::new(&config, &auth),
        })
        .unwrap();
        let data = &body["data"];
        assert_eq!(data["ACCOUNT_NAME"], "XY12345");
        assert_eq!(data["LOGIN_NAME"], "analyst");
        assert_eq!(data["AUTHENTICATOR"], "SNOWFLAKE_JWT");
        assert_eq!(data["TOKEN"], "jwt-token");
        assert_eq!(data["SESSION_PARAMETERS"]["QUERY_RESULT_FORMAT"], "JSON");
        assert!(data.get("PROOF_KEY").is_none());
    }

    #[test]
    fn test_login_body_for_browser_carries_proof_key() {
        let config = config();
        let auth = LoginAuth {
            authenticator: AUTHENTICATOR_BROWSER,
            token: "sso-token".into(),
            proof_key: Some("proof".into()),
        };
        let body = serde_json::to_value(LoginRequest {
            data: LoginData::new(&config, &auth),
        })
        .unwrap();
        assert_eq!(body["data"]["AUTHENTICATOR"], "EXTERNALBROWSER");
        assert_eq!(body["data"]["PROOF_KEY"], "proof");
    }

    #[test]
    fn test_api_response_numeric_code() {
        let response: ApiResponse<JsonValue> =
            serde_json::from_str(r#"{"success":false,"code":390100,"message":"expired"}"#).unwrap();
        assert_eq!(response.code().as_deref(), Some("390100"));
        assert_eq!(response.message(), "expired");
        assert!(response.data.is_none());
    }

    #[test]
    fn test_query_response_parsing() {
        let json = r#"{
            "success": true,
            "code": null,
            "data": {
                "queryId": "01b2",
                "rowtype": [
                    {"name": "ID", "type": "fixed", "nullable": false},
                    {"name": "NAME", "type": "text", "nullable": true}
                ],
                "rowset": [["1", "alice"], ["2", null]]
            }
        }"#;
        let response: ApiResponse<QueryResponseData> = serde_json::from_str(json).unwrap();
        let data = response.data.unwrap();
        assert_eq!(data.rowtype.len(), 2);
        assert_eq!(data.rowtype[1].type_name, "text");
        let rows: Vec<Vec<Cell>> = data.rowset.into_iter().map(to_cells).collect();
        assert_eq!(rows[1], vec![Some("2".to_string()), None]);
    }

    #[test]
    fn test_parse_chunk() {
        let rows = parse_chunk(r#"["1","a"],["2",null]"#).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec![Some("1".to_string()), Some("a".to_string())]);
        assert_eq!(rows[1][1], None);
    }

    #[test]
    fn test_parse_chunk_rejects_garbage() {
        assert!(parse_chunk("not json").is_err());
    }

    #[test]
    fn test_non_string_values_are_rendered() {
        let cells = to_cells(vec![serde_json::json!(42), serde_json::json!(true)]);
        assert_eq!(cells, vec![Some("42".to_string()), Some("true".to_string())]);
    }

    #[test]
    fn test_chunk_headers_from_qrmk() {
        let data = QueryResponseData {
            qrmk: Some("secret-key".into()),
            ..Default::default()
        };
        let headers = chunk_headers(&data).unwrap();
        assert_eq!(
            headers["x-amz-server-side-encryption-customer-key"],
            "secret-key"
        );
    }

    #[test]
    fn test_chunk_headers_prefer_explicit_headers() {
        let data = QueryResponseData {
            chunk_headers: Some(HashMap::from([("x-custom".to_string(), "v".to_string())])),
            qrmk: Some("secret-key".into()),
            ..Default::default()
        };
        let headers = chunk_headers(&data).unwrap();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers["x-custom"], "v");
    }
}
