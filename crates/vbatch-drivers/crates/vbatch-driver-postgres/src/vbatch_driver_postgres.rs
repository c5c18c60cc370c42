//! PostgreSQL driver implementation

mod connection;
mod driver;
mod literal;
mod tls;

#[cfg(test)]
mod literal_tests;

pub use connection::{PostgresConnection, PostgresTransaction};
pub use driver::PostgresDriver;
pub use literal::PostgresLiterals;
pub use tls::{SslMode, TlsError, TlsSettings};
