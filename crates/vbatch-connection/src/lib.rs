//! vbatch connection - pooled connections configured per node
//!
//! - [`NodeSettings`] - reads the `connection` / `connection_pool` sections
//!   of the node named by `PG_NODE`
//! - [`ConnectionPool`] - bounded pool with lifetime and idle expiry
//! - [`DriverConnectionFactory`] - opens connections through a registered driver
//! - [`PoolCache`] - explicitly owned cache of pools and connections keyed by
//!   section and overrides

mod cache;
mod factory;
pub mod pool;
pub mod settings;

pub use cache::{CacheKey, PoolCache};
pub use factory::{ConnectionFactory, DriverConnectionFactory};
pub use pool::{ConnectionPool, PoolConfig, PoolStats, PooledConnection};
pub use settings::{ConnectionSection, NodeSettings, SectionKind};
