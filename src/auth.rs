//! Bearer token authentication for the HTTP transport.
//!
//! Tokens come from `--auth-token` / `MCP_AUTH_TOKENS`. With no tokens
//! configured the middleware is not installed at all.

use crate::error::{DbError, DbResult};
use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

/// Accepted bearer tokens.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    tokens: HashSet<String>,
}

impl AuthConfig {
    /// Build from explicit token values. Blank entries are a configuration error.
    pub fn from_tokens(tokens: Vec<String>) -> DbResult<Self> {
        let mut accepted = HashSet::new();
        for token in tokens {
            let token = token.trim();
            if token.is_empty() {
                return Err(DbError::configuration(
                    "MCP_AUTH_TOKENS contains an empty token",
                ));
            }
            accepted.insert(token.to_string());
        }
        Ok(Self { tokens: accepted })
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        !self.tokens.is_empty()
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// Compare against every configured token without short-circuiting.
    pub fn verify(&self, provided: &str) -> bool {
        self.tokens.iter().fold(false, |found, expected| {
            let matches = expected.len() == provided.len()
                && bool::from(expected.as_bytes().ct_eq(provided.as_bytes()));
            found | matches
        })
    }
}

/// Reject requests without a valid `Authorization: Bearer <token>` header.
pub async fn auth_middleware(
    State(auth_config): State<Arc<AuthConfig>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let token = match bearer_token(&request) {
        Ok(token) => token,
        Err(message) => {
            warn!(reason = message, "Rejected unauthenticated request");
            return unauthorized(message);
        }
    };

    if auth_config.verify(token) {
        debug!("Request authenticated");
        next.run(request).await
    } else {
        warn!(token_prefix = %mask_token(token), "Rejected request with unknown token");
        unauthorized("Invalid Bearer token")
    }
}

fn bearer_token(request: &Request<Body>) -> Result<&str, &'static str> {
    let value = request
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or("Missing Bearer token in Authorization header")?
        .to_str()
        .map_err(|_| "Authorization header contains invalid characters")?;

    let token = value
        .strip_prefix("Bearer ")
        .ok_or("Invalid Authorization header format. Expected 'Bearer <token>'")?
        .trim();
    if token.is_empty() {
        return Err("Bearer token is empty");
    }
    Ok(token)
}

fn mask_token(token: &str) -> String {
    match token.char_indices().nth(3) {
        Some((idx, _)) => format!("{}***", &token[..idx]),
        None => "***".to_string(),
    }
}

fn unauthorized(message: &str) -> Response {
    #[derive(Serialize)]
    struct ErrorBody<'a> {
        error: ErrorDetail<'a>,
    }

    #[derive(Serialize)]
    struct ErrorDetail<'a> {
        code: &'static str,
        message: &'a str,
    }

    let body = serde_json::to_string(&ErrorBody {
        error: ErrorDetail {
            code: "unauthorized",
            message,
        },
    })
    .unwrap_or_else(|_| r#"{"error":{"code":"unauthorized"}}"#.to_string());

    (
        StatusCode::UNAUTHORIZED,
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response()
}
