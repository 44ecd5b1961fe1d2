//! Error types for the Snowflake MCP Server.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Each error variant provides actionable messages to help AI assistants understand
//! and recover from error conditions.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Authentication failed: {message}")]
    Authentication { message: String, suggestion: String },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// Snowflake error code, e.g. "002003" for a missing object
        sql_state: Option<String>,
        suggestion: String,
    },

    #[error("Only read-only queries are allowed. Found statement type: {operation}. {reason}")]
    Permission { operation: String, reason: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an authentication error with a helpful suggestion.
    pub fn authentication(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a database error with optional error code.
    pub fn database(
        message: impl Into<String>,
        sql_state: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
            suggestion: suggestion.into(),
        }
    }

    /// Create a permission error for a rejected statement kind.
    pub fn permission(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Permission {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Authentication { suggestion, .. } => Some(suggestion),
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Database { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }

    /// Render the error as the text block returned to tool callers.
    ///
    /// Every tool failure goes through here so callers always see the same
    /// `Error: ` prefix, followed by the suggestion when one exists.
    pub fn to_tool_text(&self) -> String {
        let mut text = format!("Error: {}", self);
        if let Self::Database {
            sql_state: Some(code),
            ..
        } = self
        {
            text.push_str(&format!(" (code: {})", code));
        }
        if let Some(suggestion) = self.suggestion().filter(|s| !s.is_empty()) {
            text.push_str(&format!("\nSuggestion: {}", suggestion));
        }
        text
    }
}

/// Convert HTTP client errors to DbError.
impl From<reqwest::Error> for DbError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DbError::connection(
                format!("Request timed out: {}", err),
                "Check network connectivity or raise the request timeout",
            )
        } else if err.is_connect() {
            DbError::connection(
                format!("Could not reach Snowflake: {}", err),
                "Check the account identifier, host override and network connectivity",
            )
        } else if err.is_decode() {
            DbError::internal(format!("Unexpected response from Snowflake: {}", err))
        } else if let Some(status) = err.status() {
            DbError::connection(
                format!("HTTP {} from Snowflake: {}", status, err),
                "Check the account identifier and that the service is available",
            )
        } else {
            DbError::connection(
                format!("HTTP error: {}", err),
                "Check network connectivity and Snowflake service status",
            )
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;
