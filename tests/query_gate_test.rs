//! Integration tests for the read-only query gate.
//!
//! These tests verify that `execute_query` input is classified from the
//! parsed statement, so casing, comments and Snowflake-specific syntax do not
//! change the verdict.

use snowflake_mcp_server::error::DbError;
use snowflake_mcp_server::tools::sql_validator::{
    READ_ONLY_KINDS, is_read_only_kind, statement_kinds, validate_readonly,
};

fn rejected_kind(sql: &str) -> String {
    match validate_readonly(sql) {
        Err(DbError::Permission { operation, .. }) => operation,
        other => panic!("expected permission error for {:?}, got {:?}", sql, other),
    }
}

/// Test that the allow-list is exactly the five read-only kinds.
#[test]
fn test_allow_list() {
    assert_eq!(READ_ONLY_KINDS.len(), 5);
    for kind in ["select", "show", "describe", "explain", "with"] {
        assert!(is_read_only_kind(kind), "{} should be allowed", kind);
    }
    assert!(!is_read_only_kind("insert"));
    assert!(!is_read_only_kind("SELECT"), "kinds are lower-case");
}

/// Test that lowercase keywords and a trailing semicolon are accepted.
#[test]
fn test_lowercase_and_semicolon() {
    assert!(validate_readonly("select id from orders;").is_ok());
}

/// Test that a leading comment does not hide a write.
#[test]
fn test_comment_does_not_hide_delete() {
    assert!(validate_readonly("/* read */ SELECT 1").is_ok());
    assert_eq!(rejected_kind("-- harmless\nDELETE FROM orders"), "delete");
}

/// Test Snowflake query syntax passes the gate.
#[test]
fn test_snowflake_select_syntax() {
    let qualify = "SELECT id FROM orders \
                   QUALIFY ROW_NUMBER() OVER (PARTITION BY customer ORDER BY id) = 1";
    assert!(validate_readonly(qualify).is_ok());
    assert!(validate_readonly("SELECT payload:customer.name::string FROM events").is_ok());
}

/// Test that MERGE is rejected.
#[test]
fn test_merge_rejected() {
    let sql = "MERGE INTO target t USING source s ON t.id = s.id \
               WHEN MATCHED THEN UPDATE SET t.v = s.v";
    assert_eq!(rejected_kind(sql), "merge");
}

/// Test that TRUNCATE is rejected.
#[test]
fn test_truncate_rejected() {
    assert_eq!(rejected_kind("TRUNCATE TABLE orders"), "truncate");
}

/// Test that session-changing statements are rejected; the tools switch
/// context themselves.
#[test]
fn test_use_rejected() {
    assert_eq!(rejected_kind("USE DATABASE sales"), "use");
}

/// Test that a write after reads is still rejected.
#[test]
fn test_write_after_reads_rejected() {
    let sql = "SELECT 1; SHOW DATABASES; DROP TABLE orders";
    assert_eq!(rejected_kind(sql), "drop");
    assert_eq!(
        statement_kinds(sql).unwrap(),
        vec!["select", "show", "drop"]
    );
}

/// Test that the rejection message is the one tool callers see.
#[test]
fn test_rejection_message() {
    let err = validate_readonly("INSERT INTO t VALUES (1)").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Only read-only queries are allowed. Found statement type: insert. \
         Only SELECT, SHOW, DESCRIBE, EXPLAIN and WITH statements can be executed."
    );
}

/// Test that unparseable SQL is an input error, not a permission error.
#[test]
fn test_parse_failure_is_invalid_input() {
    let err = validate_readonly("SELECT * FROM (").unwrap_err();
    assert!(matches!(err, DbError::InvalidInput { .. }), "{:?}", err);
}

/// Test that a CTE in front of DML is classified by the DML.
#[test]
fn test_cte_prefixed_writes_rejected() {
    assert_eq!(rejected_kind("WITH x AS (SELECT 1) DELETE FROM orders"), "delete");
    assert_eq!(
        rejected_kind("WITH x AS (SELECT 1) INSERT INTO orders SELECT * FROM x"),
        "insert"
    );
    assert_eq!(
        rejected_kind("WITH x AS (SELECT 1) UPDATE orders SET status = 'x'"),
        "update"
    );
    assert!(validate_readonly("WITH x AS (SELECT 1) SELECT * FROM x").is_ok());
}

/// Test Snowflake's `DESCRIBE VIEW` form, which the catalog tools issue.
#[test]
fn test_describe_view_accepted() {
    assert!(validate_readonly("DESCRIBE VIEW sales.public.orders_v").is_ok());
    assert!(validate_readonly("-- columns\nDESC VIEW orders_v").is_ok());
    assert_eq!(
        statement_kinds("DESCRIBE VIEW db.s.v").unwrap(),
        vec!["describe"]
    );
    assert_eq!(rejected_kind("DESCRIBE VIEW db.s.v; DELETE FROM orders"), "delete");
}
