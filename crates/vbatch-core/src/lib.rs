//! vbatch core - shared abstractions for bulk VALUES execution
//!
//! This crate provides the types and traits every other vbatch crate
//! depends on:
//!
//! - `DatabaseDriver` - Trait for database driver implementations
//! - `Connection` / `Transaction` - Traits for open connections and transactions
//! - `LiteralDialect` - Driver-owned rendering of values as SQL literals
//! - Common types like `Value`, `Row`, `QueryResult`

mod connection;
mod driver;
mod error;
pub mod literal;
mod types;

pub use connection::*;
pub use driver::*;
pub use error::*;
pub use literal::{AnsiLiterals, LiteralDialect};
pub use types::*;
