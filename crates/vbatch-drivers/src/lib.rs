//! vbatch drivers - database driver implementations
//!
//! This crate re-exports the concrete drivers behind cargo features and
//! provides a [`DriverRegistry`] to look them up by name.

#[cfg(feature = "postgres")]
pub use vbatch_driver_postgres as postgres;
#[cfg(feature = "sqlite")]
pub use vbatch_driver_sqlite as sqlite;

mod registry;

pub use registry::DriverRegistry;

/// Re-export commonly used types from vbatch-core
pub use vbatch_core::{
    ColumnMeta, Connection, ConnectionConfig, DatabaseDriver, QueryResult, Result, Row,
    StatementResult, Transaction, Value, VbatchError,
};
