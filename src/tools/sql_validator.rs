//! SQL statement validation for read-only enforcement.
//!
//! The `execute_query` tool only runs statements whose kind is in
//! [`READ_ONLY_KINDS`]. Statements are parsed with the Snowflake dialect of
//! [sqlparser](https://docs.rs/sqlparser/) and classified from the AST, so
//! formatting tricks and comments cannot smuggle a write through.

use crate::error::{DbError, DbResult};
use sqlparser::ast::{SetExpr, Statement};
use sqlparser::dialect::SnowflakeDialect;
use sqlparser::keywords::Keyword;
use sqlparser::parser::Parser;
use sqlparser::tokenizer::{Token, Tokenizer};

/// Statement kinds the query tool accepts.
pub const READ_ONLY_KINDS: &[&str] = &["select", "show", "describe", "explain", "with"];

mod error_messages {
    pub const NOT_READ_ONLY: &str =
        "Only SELECT, SHOW, DESCRIBE, EXPLAIN and WITH statements can be executed.";
    pub const PARSE_ERROR: &str = "Failed to parse SQL statement.";
    pub const EMPTY: &str = "Empty SQL statement";
}

/// Validate SQL for read-only execution.
///
/// Returns `Ok(())` when every statement is read-only, `Err(DbError::Permission)`
/// naming the first offending statement kind otherwise, and
/// `Err(DbError::InvalidInput)` for unparseable or empty input.
///
/// # Examples
///
/// ```
/// use snowflake_mcp_server::tools::sql_validator::validate_readonly;
///
/// assert!(validate_readonly("SELECT * FROM users").is_ok());
/// assert!(validate_readonly("INSERT INTO users VALUES (1)").is_err());
/// ```
pub fn validate_readonly(sql: &str) -> DbResult<()> {
    for kind in statement_kinds(sql)? {
        if !is_read_only_kind(&kind) {
            return Err(DbError::permission(kind, error_messages::NOT_READ_ONLY));
        }
    }
    Ok(())
}

/// Parse `sql` and classify every statement in it.
///
/// sqlparser only knows `DESCRIBE [TABLE] <name>`, so input it rejects is
/// retried statement by statement with Snowflake's `DESCRIBE <kind> <name>`
/// forms classified from their leading keyword.
pub fn statement_kinds(sql: &str) -> DbResult<Vec<String>> {
    let dialect = SnowflakeDialect {};
    let kinds: Vec<String> = match Parser::parse_sql(&dialect, sql) {
        Ok(statements) => statements.iter().map(statement_kind).collect(),
        Err(e) => kinds_with_describe(&dialect, sql).ok_or_else(|| {
            DbError::invalid_input(format!("{} Error: {}", error_messages::PARSE_ERROR, e))
        })?,
    };

    if kinds.is_empty() {
        return Err(DbError::invalid_input(error_messages::EMPTY));
    }
    Ok(kinds)
}

/// Classify `sql` one statement at a time, treating statements that start
/// with `DESC`/`DESCRIBE` as describes.
///
/// Returns `None` when no statement is a describe or another statement
/// fails to parse.
fn kinds_with_describe(dialect: &SnowflakeDialect, sql: &str) -> Option<Vec<String>> {
    let tokens = Tokenizer::new(dialect, sql).tokenize().ok()?;
    let segments: Vec<Vec<Token>> = tokens
        .split(|token| *token == Token::SemiColon)
        .map(<[Token]>::to_vec)
        .collect();
    if !segments.iter().any(|segment| starts_with_describe(segment)) {
        return None;
    }

    let mut kinds = Vec::new();
    for segment in segments {
        if starts_with_describe(&segment) {
            kinds.push("describe".to_string());
            continue;
        }
        if segment.iter().all(|token| matches!(token, Token::Whitespace(_))) {
            continue;
        }
        let statements = Parser::new(dialect)
            .with_tokens(segment)
            .parse_statements()
            .ok()?;
        kinds.extend(statements.iter().map(statement_kind));
    }
    Some(kinds)
}

fn starts_with_describe(tokens: &[Token]) -> bool {
    matches!(
        tokens.iter().find(|token| !matches!(token, Token::Whitespace(_))),
        Some(Token::Word(word)) if matches!(word.keyword, Keyword::DESC | Keyword::DESCRIBE)
    )
}

pub fn is_read_only_kind(kind: &str) -> bool {
    READ_ONLY_KINDS.contains(&kind)
}

/// Lower-cased kind label of a parsed statement.
///
/// EXPLAIN of a statement that is not read-only reports the inner kind, as
/// does a `WITH` clause in front of DML.
pub fn statement_kind(stmt: &Statement) -> String {
    match stmt {
        Statement::Query(query) => match &*query.body {
            SetExpr::Insert(inner)
            | SetExpr::Update(inner)
            | SetExpr::Delete(inner)
            | SetExpr::Merge(inner) => statement_kind(inner),
            _ if query.with.is_some() => "with".to_string(),
            _ => "select".to_string(),
        },
        Statement::Explain { statement, .. } => {
            let inner = statement_kind(statement);
            if is_read_only_kind(&inner) {
                "explain".to_string()
            } else {
                inner
            }
        }
        other => leading_keyword(&other.to_string()),
    }
}

fn leading_keyword(rendered: &str) -> String {
    let word = rendered
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .trim_matches(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .to_lowercase();
    match word.as_str() {
        "" => "unknown".to_string(),
        "desc" => "describe".to_string(),
        _ => word,
    }
}
