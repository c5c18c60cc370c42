//! Connection pooling for database connections
//!
//! # Example
//!
//! ```ignore
//! use vbatch_connection::pool::{ConnectionPool, PoolConfig};
//!
//! let config = PoolConfig::new(4, 8)
//!     .with_acquire_timeout_ms(5000)
//!     .with_max_waiting(16);
//!
//! let pool = ConnectionPool::new(config, factory);
//! pool.open().await?;
//! let conn = pool.get().await?;
//! // Connection returned to pool on drop
//! ```

mod config;
#[allow(clippy::module_inception)]
mod pool;
mod stats;


pub use config::PoolConfig;
pub use pool::{ConnectionPool, PooledConnection};
pub use stats::PoolStats;
