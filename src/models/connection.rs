//! Connection-related data models.
//!
//! This module defines the validated Snowflake connection configuration.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{DbError, DbResult};

/// Authentication mode used when opening a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    /// Key-pair authentication with an RSA private key file
    #[default]
    #[value(name = "private_key")]
    PrivateKey,
    /// Interactive single sign-on in the user's web browser
    #[value(name = "external_browser")]
    ExternalBrowser,
}

impl std::fmt::Display for AuthType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PrivateKey => write!(f, "private_key"),
            Self::ExternalBrowser => write!(f, "external_browser"),
        }
    }
}

/// Validated Snowflake connection configuration.
///
/// Built once through [`SnowflakeConfig::new`] and the `with_*` constructors;
/// fields are read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnowflakeConfig {
    account: String,
    user: String,
    auth_type: AuthType,
    private_key_path: Option<PathBuf>,
    warehouse: Option<String>,
    database: Option<String>,
    schema: Option<String>,
    role: Option<String>,
    host: Option<String>,
}

impl SnowflakeConfig {
    /// Create a new configuration.
    ///
    /// Fails with a configuration error when the account or user is empty, or
    /// when `auth_type` is [`AuthType::PrivateKey`] and no key path is given.
    pub fn new(
        account: impl Into<String>,
        user: impl Into<String>,
        auth_type: AuthType,
        private_key_path: Option<String>,
    ) -> DbResult<Self> {
        let account = account.into().trim().to_string();
        let user = user.into().trim().to_string();

        if account.is_empty() {
            return Err(DbError::configuration(
                "account is required (set SNOWFLAKE_ACCOUNT)",
            ));
        }
        if user.is_empty() {
            return Err(DbError::configuration("user is required (set SNOWFLAKE_USER)"));
        }

        let private_key_path = non_empty(private_key_path).map(PathBuf::from);
        if auth_type == AuthType::PrivateKey && private_key_path.is_none() {
            return Err(DbError::configuration(
                "private_key_path is required when auth_type is private_key (set SNOWFLAKE_PRIVATE_KEY_PATH)",
            ));
        }

        Ok(Self {
            account,
            user,
            auth_type,
            private_key_path,
            warehouse: None,
            database: None,
            schema: None,
            role: None,
            host: None,
        })
    }

    pub fn with_warehouse(mut self, warehouse: Option<String>) -> Self {
        self.warehouse = non_empty(warehouse);
        self
    }

    pub fn with_database(mut self, database: Option<String>) -> Self {
        self.database = non_empty(database);
        self
    }

    pub fn with_schema(mut self, schema: Option<String>) -> Self {
        self.schema = non_empty(schema);
        self
    }

    pub fn with_role(mut self, role: Option<String>) -> Self {
        self.role = non_empty(role);
        self
    }

    /// Override the host name (defaults to `<account>.snowflakecomputing.com`).
    pub fn with_host(mut self, host: Option<String>) -> Self {
        self.host = non_empty(host);
        self
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn auth_type(&self) -> AuthType {
        self.auth_type
    }

    pub fn private_key_path(&self) -> Option<&Path> {
        self.private_key_path.as_deref()
    }

    pub fn warehouse(&self) -> Option<&str> {
        self.warehouse.as_deref()
    }

    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    /// Host name of the account endpoint.
    pub fn host(&self) -> String {
        match &self.host {
            Some(host) => host.clone(),
            None => format!("{}.snowflakecomputing.com", self.account.to_lowercase()),
        }
    }

    /// Account name as sent in login requests and JWT claims: the part before
    /// the first dot, upper-cased (`xy12345.us-east-1` becomes `XY12345`).
    pub fn account_name(&self) -> String {
        self.account
            .split('.')
            .next()
            .unwrap_or(&self.account)
            .to_uppercase()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_private_key_requires_path() {
        let err = SnowflakeConfig::new("acct", "user", AuthType::PrivateKey, None).unwrap_err();
        assert!(matches!(err, DbError::Configuration { .. }));
        assert!(err.to_string().contains("private_key_path"));
    }

    #[test]
    fn test_private_key_rejects_empty_path() {
        for path in ["", "   "] {
            let result =
                SnowflakeConfig::new("acct", "user", AuthType::PrivateKey, Some(path.into()));
            assert!(
                matches!(result, Err(DbError::Configuration { .. })),
                "path {:?} should be rejected",
                path
            );
        }
    }

    #[test]
    fn test_browser_does_not_require_path() {
        let config = SnowflakeConfig::new("acct", "user", AuthType::ExternalBrowser, None).unwrap();
        assert_eq!(config.auth_type(), AuthType::ExternalBrowser);
        assert!(config.private_key_path().is_none());
    }

    #[test]
    fn test_account_and_user_required() {
        assert!(SnowflakeConfig::new("", "user", AuthType::ExternalBrowser, None).is_err());
        assert!(SnowflakeConfig::new("acct", " ", AuthType::ExternalBrowser, None).is_err());
    }

    #[test]
    fn test_empty_optionals_are_absent() {
        let config = SnowflakeConfig::new("acct", "user", AuthType::ExternalBrowser, None)
            .unwrap()
            .with_warehouse(Some(String::new()))
            .with_database(Some("ANALYTICS".into()))
            .with_schema(None)
            .with_role(Some("  ".into()));
        assert_eq!(config.warehouse(), None);
        assert_eq!(config.database(), Some("ANALYTICS"));
        assert_eq!(config.schema(), None);
        assert_eq!(config.role(), None);
    }

    #[test]
    fn test_host_and_account_name() {
        let config =
            SnowflakeConfig::new("xy12345.us-east-1", "user", AuthType::ExternalBrowser, None)
                .unwrap();
        assert_eq!(config.host(), "xy12345.us-east-1.snowflakecomputing.com");
        assert_eq!(config.account_name(), "XY12345");

        let config = config.with_host(Some("localhost:8443".into()));
        assert_eq!(config.host(), "localhost:8443");
    }

    #[test]
    fn test_auth_type_display() {
        assert_eq!(AuthType::PrivateKey.to_string(), "private_key");
        assert_eq!(AuthType::ExternalBrowser.to_string(), "external_browser");
    }
}
