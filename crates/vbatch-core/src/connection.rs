//! Connection trait and transaction handling

use crate::{AnsiLiterals, LiteralDialect, QueryResult, Result, StatementResult, Value};
use async_trait::async_trait;

static ANSI_LITERALS: AnsiLiterals = AnsiLiterals;

/// A database connection
#[async_trait]
pub trait Connection: Send + Sync {
    /// Get the driver name (e.g., "sqlite", "postgresql")
    fn driver_name(&self) -> &str;

    /// Execute a statement that modifies data (INSERT/UPDATE/DELETE)
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult>;

    /// Execute a statement that returns rows (SELECT, INSERT ... RETURNING)
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult>;

    /// How this connection's driver renders values as SQL literals.
    ///
    /// Composed bulk statements embed every value as a literal, so the driver
    /// decides the encoding (JSON markers, binary data, booleans).
    fn literals(&self) -> &dyn LiteralDialect {
        &ANSI_LITERALS
    }

    /// Begin a transaction
    async fn begin_transaction(&self) -> Result<Box<dyn Transaction>>;

    /// Close the connection
    async fn close(&self) -> Result<()>;

    /// Check if the connection is closed
    fn is_closed(&self) -> bool;
}

/// A database transaction
#[async_trait]
pub trait Transaction: Send + Sync {
    /// Commit the transaction
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Rollback the transaction
    async fn rollback(self: Box<Self>) -> Result<()>;

    /// Execute a query within the transaction
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult>;

    /// Execute a statement within the transaction
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult>;
}
