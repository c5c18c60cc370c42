//! Tests for the SQLite connection and transactions

use pretty_assertions::assert_eq;
use vbatch_core::{Connection, ConnectionConfig, DatabaseDriver, Value, VbatchError};

use crate::connection::expand_path;
use crate::{SqliteConnection, SqliteDriver};

async fn memory_db() -> SqliteConnection {
    let conn = SqliteConnection::open(":memory:").expect("open in-memory database");
    conn.execute_batch("CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT NOT NULL UNIQUE)")
        .await
        .expect("create table");
    conn
}

async fn count(conn: &SqliteConnection) -> i64 {
    let result = conn
        .query("SELECT COUNT(*) FROM items", &[])
        .await
        .expect("count");
    result.rows[0].get(0).and_then(Value::as_i64).expect("integer")
}

#[tokio::test]
async fn test_query_with_params() {
    let conn = memory_db().await;
    conn.execute(
        "INSERT INTO items (name) VALUES (?1), (?2)",
        &[Value::from("a"), Value::from("b")],
    )
    .await
    .expect("insert");

    let result = conn
        .query("SELECT id, name FROM items ORDER BY id", &[])
        .await
        .expect("select");
    assert_eq!(result.row_count(), 2);
    assert_eq!(result.columns[1].name, "name");
    assert_eq!(result.rows[1].get_by_name("name"), Some(&Value::from("b")));
}

#[tokio::test]
async fn test_execute_accepts_returning_clause() {
    let conn = memory_db().await;
    let result = conn
        .execute("INSERT INTO items (name) VALUES ('a'), ('b') RETURNING id", &[])
        .await
        .expect("insert returning");
    assert_eq!(result.affected_rows, 2);
    assert_eq!(count(&conn).await, 2);
}

#[tokio::test]
async fn test_rollback_discards_changes() {
    let conn = memory_db().await;
    let tx = conn.begin_transaction().await.expect("begin");
    tx.execute("INSERT INTO items (name) VALUES ('a')", &[])
        .await
        .expect("insert");
    tx.rollback().await.expect("rollback");

    assert_eq!(count(&conn).await, 0);
}

#[tokio::test]
async fn test_commit_keeps_changes() {
    let conn = memory_db().await;
    let tx = conn.begin_transaction().await.expect("begin");
    let returned = tx
        .query("INSERT INTO items (name) VALUES ('a') RETURNING name", &[])
        .await
        .expect("insert");
    tx.commit().await.expect("commit");

    assert_eq!(returned.rows[0].get(0), Some(&Value::from("a")));
    assert_eq!(count(&conn).await, 1);
}

#[tokio::test]
async fn test_dropped_transaction_rolls_back() {
    let conn = memory_db().await;
    {
        let tx = conn.begin_transaction().await.expect("begin");
        tx.execute("INSERT INTO items (name) VALUES ('a')", &[])
            .await
            .expect("insert");
    }
    assert_eq!(count(&conn).await, 0);
}

#[tokio::test]
async fn test_constraint_violation_is_a_query_error() {
    let conn = memory_db().await;
    let err = conn
        .execute("INSERT INTO items (name) VALUES ('a'), ('a')", &[])
        .await
        .expect_err("duplicate name");

    assert!(err.is_database_error());
    assert!(err.to_string().contains("UNIQUE"));
}

#[tokio::test]
async fn test_closed_connection_rejects_statements() {
    let conn = memory_db().await;
    conn.close().await.expect("close");
    assert!(conn.is_closed());

    let err = conn.query("SELECT 1", &[]).await.expect_err("closed");
    assert!(matches!(err, VbatchError::Connection(_)));
}

#[tokio::test]
async fn test_driver_connects_to_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("test.db");
    let config = ConnectionConfig::new_sqlite(&path.to_string_lossy());

    let driver = SqliteDriver::new();
    driver.test_connection(&config).await.expect("test connection");
    assert!(path.exists());
    assert_eq!(driver.build_connection_string(&config), path.to_string_lossy());
}

#[tokio::test]
async fn test_driver_requires_path() {
    let config = ConnectionConfig::new("sqlite", "no path");
    let result = SqliteDriver::new().connect(&config).await;
    assert!(matches!(result, Err(VbatchError::Configuration(_))));
}

#[test]
fn test_expand_path_keeps_special_paths() {
    assert_eq!(expand_path(":memory:").expect("memory"), ":memory:");
    assert_eq!(
        expand_path("file:test.db?mode=memory").expect("uri"),
        "file:test.db?mode=memory"
    );
    assert!(expand_path("~other/db.sqlite").is_err());
}

#[test]
fn test_expand_path_makes_relative_paths_absolute() {
    let expanded = expand_path("data/app.db").expect("expand");
    assert!(std::path::Path::new(&expanded).is_absolute());
    assert!(expanded.ends_with("app.db"));
}
