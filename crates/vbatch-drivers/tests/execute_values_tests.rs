#![cfg(feature = "sqlite")]

//! Integration tests running bulk VALUES batches against a real SQLite database

use anyhow::Result;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tempfile::TempDir;
use vbatch_core::{Connection, ConnectionConfig, DatabaseDriver, Value, VbatchError};
use vbatch_drivers::sqlite::SqliteDriver;
use vbatch_values::{ExecuteOptions, Record, execute_values};

fn initialize_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::from_default_env()
                    .add_directive("vbatch_values=debug".parse().unwrap()),
            )
            .with_test_writer()
            .finish();

        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

/// Open a file-backed database with a `people` table
async fn setup() -> Result<(TempDir, Arc<dyn Connection>)> {
    initialize_logging();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("vbatch.db");

    let config = ConnectionConfig::new_sqlite(path.to_str().unwrap());
    let conn = SqliteDriver::new().connect(&config).await?;
    conn.execute(
        "CREATE TABLE people (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            meta TEXT
        )",
        &[],
    )
    .await?;

    Ok((dir, conn))
}

fn person(id: i64, name: &str) -> Record {
    Record::named([("id", Value::from(id)), ("name", Value::from(name))])
}

async fn count_people(conn: &dyn Connection) -> Result<i64> {
    let result = conn.query("SELECT COUNT(*) FROM people", &[]).await?;
    Ok(result.rows[0].get(0).and_then(Value::as_i64).unwrap_or(-1))
}

#[tokio::test]
async fn test_inserts_every_page() -> Result<()> {
    let (_dir, conn) = setup().await?;
    let rows: Vec<Record> = (1..=7).map(|i| person(i, &format!("p{i}"))).collect();

    let fetched = execute_values(
        conn.as_ref(),
        "INSERT INTO people (id, name) VALUES (%s)",
        &rows,
        "{id}, {name}",
        &ExecuteOptions::new().with_page_size(3),
    )
    .await?;

    assert!(fetched.is_none());
    assert_eq!(count_people(conn.as_ref()).await?, 7);
    Ok(())
}

#[tokio::test]
async fn test_failure_on_last_page_leaves_nothing_behind() -> Result<()> {
    let (_dir, conn) = setup().await?;
    // Page three repeats id 1 and violates the primary key
    let rows = vec![
        person(1, "a"),
        person(2, "b"),
        person(3, "c"),
        person(4, "d"),
        person(1, "dup"),
    ];

    let err = execute_values(
        conn.as_ref(),
        "INSERT INTO people (id, name) VALUES (%s)",
        &rows,
        "{id}, {name}",
        &ExecuteOptions::new().with_page_size(2),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, VbatchError::Query(_)), "got {err:?}");
    assert_eq!(count_people(conn.as_ref()).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_returning_rows_are_fetched_across_pages_in_order() -> Result<()> {
    let (_dir, conn) = setup().await?;
    let rows = vec![
        Record::positional([Value::from(10i64), Value::from("x")]),
        Record::positional([Value::from(20i64), Value::from("y")]),
        Record::positional([Value::from(30i64), Value::from("z")]),
    ];

    let fetched = execute_values(
        conn.as_ref(),
        "INSERT INTO people (id, name) VALUES (%s) RETURNING id, name",
        &rows,
        "%s, %s",
        &ExecuteOptions::new().with_page_size(2).with_fetch(true),
    )
    .await?
    .expect("RETURNING rows");

    let ids: Vec<i64> = fetched
        .iter()
        .filter_map(|row| row.get_by_name("id").and_then(Value::as_i64))
        .collect();
    assert_eq!(ids, vec![10, 20, 30]);
    assert_eq!(fetched[2].get_by_name("name"), Some(&Value::from("z")));
    Ok(())
}

#[tokio::test]
async fn test_nested_mapping_is_stored_as_json() -> Result<()> {
    let (_dir, conn) = setup().await?;
    let meta = Value::from_json(serde_json::json!({"team": "it's ops", "level": 3}));
    let rows = vec![Record::named([
        ("id", Value::from(1i64)),
        ("name", Value::from("Ann")),
        ("meta", meta),
    ])];

    execute_values(
        conn.as_ref(),
        "INSERT INTO people (id, name, meta) VALUES (%s)",
        &rows,
        "{id}, {name}, {meta}",
        &ExecuteOptions::new(),
    )
    .await?;

    let result = conn
        .query(
            "SELECT json_extract(meta, '$.team'), json_extract(meta, '$.level') FROM people",
            &[],
        )
        .await?;
    assert_eq!(result.rows[0].get(0), Some(&Value::from("it's ops")));
    assert_eq!(result.rows[0].get(1).and_then(Value::as_i64), Some(3));
    Ok(())
}

#[tokio::test]
async fn test_failing_statement_is_dumped_in_debug_mode() -> Result<()> {
    let (dir, conn) = setup().await?;
    let dump = dir.path().join("failed.sql");
    let rows = vec![person(1, "a"), person(1, "b")];

    let result = execute_values(
        conn.as_ref(),
        "INSERT INTO people (id, name) VALUES (%s)",
        &rows,
        "{id}, {name}",
        &ExecuteOptions::new().with_debug(true).with_dump_to(&dump),
    )
    .await;

    assert!(result.is_err());
    let dumped = std::fs::read_to_string(&dump)?;
    assert_eq!(
        dumped,
        "INSERT INTO people (id, name) VALUES (1, 'a'),(1, 'b')"
    );
    Ok(())
}
