//! Batch execution
//!
//! [`execute_values`] splits the input rows into pages, composes one statement
//! per page and runs all of them inside a single transaction. Either every page
//! is committed or, on the first failure, the transaction is rolled back and the
//! original error is returned.


use std::path::{Path, PathBuf};

use vbatch_core::{Connection, Result, Row, Transaction, VbatchError};

use crate::compose::{ValuesSite, compose_page};
use crate::record::Record;
use crate::template::ValuesTemplate;

/// Options for [`execute_values`]
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    page_size: Option<usize>,
    fetch: bool,
    debug: bool,
    dump_to: Option<PathBuf>,
}

impl ExecuteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows per statement. Defaults to all rows in one statement.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Collect the rows returned by every page (`RETURNING ...`)
    pub fn with_fetch(mut self, fetch: bool) -> Self {
        self.fetch = fetch;
        self
    }

    /// Dump the failing statement when a page fails
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Write the failing statement to this file instead of the log.
    /// Only used together with [`ExecuteOptions::with_debug`].
    pub fn with_dump_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.dump_to = Some(path.into());
        self
    }

    pub fn page_size(&self) -> Option<usize> {
        self.page_size
    }

    pub fn fetch(&self) -> bool {
        self.fetch
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn dump_to(&self) -> Option<&Path> {
        self.dump_to.as_deref()
    }

    fn resolve_page_size(&self, row_count: usize) -> Result<usize> {
        match self.page_size {
            Some(0) => Err(VbatchError::Configuration(
                "page size must be at least 1".into(),
            )),
            Some(size) => Ok(size),
            None => Ok(row_count.max(1)),
        }
    }
}

/// Insert (or upsert) many rows through a single `VALUES (%s)` statement.
///
/// `template` describes one row, e.g. `{name}, {age}::int` for named records or
/// `%s, %s` for positional ones. The template, the values site in `query` and
/// the page size are validated before the connection is touched. An empty
/// `rows` slice returns `Ok(None)` without any database interaction.
///
/// When `options.fetch()` is set each page runs as a row-returning statement
/// and the rows of all pages are returned in order; `Some` only when at least
/// one row came back.
#[tracing::instrument(
    skip_all,
    fields(rows = rows.len(), driver = conn.driver_name(), template = %template)
)]
pub async fn execute_values(
    conn: &dyn Connection,
    query: &str,
    rows: &[Record],
    template: &str,
    options: &ExecuteOptions,
) -> Result<Option<Vec<Row>>> {
    let template = ValuesTemplate::parse(template)?;
    template.ensure_valid()?;
    let site = ValuesSite::locate(query)?;
    let page_size = options.resolve_page_size(rows.len())?;

    if rows.is_empty() {
        tracing::debug!("no rows to execute");
        return Ok(None);
    }

    let page_count = rows.len().div_ceil(page_size);
    let literals = conn.literals();
    let mut fetched = Vec::new();

    let tx = conn.begin_transaction().await?;
    tracing::debug!(page_size, page_count, "transaction started");

    for (page, chunk) in rows.chunks(page_size).enumerate() {
        let sql = match compose_page(&site, &template, chunk, page * page_size, literals) {
            Ok(sql) => sql,
            Err(e) => {
                tracing::error!(page, error = %e, "failed to compose page");
                abort(tx, None, options).await;
                return Err(e);
            }
        };

        match run_page(tx.as_ref(), &sql, options.fetch).await {
            Ok(page_rows) => {
                tracing::debug!(
                    page,
                    page_count,
                    returned = page_rows.len(),
                    sql_preview = %sql.chars().take(100).collect::<String>(),
                    "page executed"
                );
                fetched.extend(page_rows);
            }
            Err(e) => {
                tracing::error!(page, page_count, error = %e, "page failed");
                abort(tx, Some(&sql), options).await;
                return Err(e);
            }
        }
    }

    tx.commit().await?;
    tracing::info!(page_count, fetched = fetched.len(), "bulk statement committed");

    Ok((!fetched.is_empty()).then_some(fetched))
}

async fn run_page(tx: &dyn Transaction, sql: &str, fetch: bool) -> Result<Vec<Row>> {
    if fetch {
        Ok(tx.query(sql, &[]).await?.rows)
    } else {
        tx.execute(sql, &[]).await?;
        Ok(Vec::new())
    }
}

/// Roll back and, in debug mode, dump the failing statement.
/// Failures here are logged and never replace the error being returned.
async fn abort(tx: Box<dyn Transaction>, failed_sql: Option<&str>, options: &ExecuteOptions) {
    if let Err(e) = tx.rollback().await {
        tracing::error!(error = %e, "rollback after failed page also failed");
    }

    if !options.debug {
        return;
    }
    let Some(sql) = failed_sql else {
        return;
    };

    match options.dump_to() {
        Some(path) => match tokio::fs::write(path, sql).await {
            Ok(()) => tracing::info!(path = %path.display(), "failing statement dumped"),
            Err(e) => tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to dump failing statement"
            ),
        },
        None => tracing::error!(sql = %sql, "failing statement"),
    }
}
