//! SQLite database driver implementation

mod connection;
mod driver;
mod literal;

#[cfg(test)]
mod connection_tests;
#[cfg(test)]
mod literal_tests;

pub use connection::{SqliteConnection, SqliteTransaction};
pub use driver::SqliteDriver;
pub use literal::SqliteLiterals;
