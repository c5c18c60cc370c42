//! Pool configuration types

use std::time::Duration;

use serde::{Deserialize, Serialize};
use vbatch_core::{Result, VbatchError};

/// Configuration for a connection pool
///
/// Controls pool sizing, timeouts, and connection lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Number of connections opened up front and kept around
    min_size: usize,
    /// Maximum number of connections allowed in the pool
    max_size: usize,
    /// Timeout in milliseconds when acquiring a connection from the pool
    acquire_timeout_ms: u64,
    /// Timeout in milliseconds before an idle connection is closed
    idle_timeout_ms: u64,
    /// Maximum lifetime of a connection in milliseconds before it's recycled
    max_lifetime_ms: Option<u64>,
    /// Maximum number of callers allowed to queue for a connection, 0 for unlimited
    max_waiting: usize,
    /// Name used in logs
    name: Option<String>,
}

impl PoolConfig {
    /// Create a new pool configuration with the given min and max sizes
    ///
    /// # Panics
    ///
    /// Panics if `min_size > max_size` or if `max_size` is 0. Use
    /// [`try_new`](Self::try_new) for sizes read from settings.
    pub fn new(min_size: usize, max_size: usize) -> Self {
        Self::try_new(min_size, max_size).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Create a pool configuration, rejecting impossible sizes
    pub fn try_new(min_size: usize, max_size: usize) -> Result<Self> {
        if max_size == 0 {
            return Err(VbatchError::Configuration(format!(
                "max_size must be greater than 0, got {}",
                max_size
            )));
        }
        if min_size > max_size {
            return Err(VbatchError::Configuration(format!(
                "min_size ({}) cannot exceed max_size ({})",
                min_size, max_size
            )));
        }

        Ok(Self {
            min_size,
            max_size,
            acquire_timeout_ms: 30_000,
            idle_timeout_ms: 600_000,
            max_lifetime_ms: Some(3_600_000),
            max_waiting: 0,
            name: None,
        })
    }

    /// Set the acquire timeout in milliseconds
    pub fn with_acquire_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.acquire_timeout_ms = timeout_ms;
        self
    }

    /// Set the idle timeout in milliseconds
    pub fn with_idle_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.idle_timeout_ms = timeout_ms;
        self
    }

    /// Set the maximum connection lifetime in milliseconds
    pub fn with_max_lifetime_ms(mut self, lifetime_ms: u64) -> Self {
        self.max_lifetime_ms = Some(lifetime_ms);
        self
    }

    /// Keep connections regardless of age
    pub fn without_max_lifetime(mut self) -> Self {
        self.max_lifetime_ms = None;
        self
    }

    /// Limit the number of queued callers; 0 means unlimited
    pub fn with_max_waiting(mut self, max_waiting: usize) -> Self {
        self.max_waiting = max_waiting;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Get the minimum pool size
    pub fn min_size(&self) -> usize {
        self.min_size
    }

    /// Get the maximum pool size
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Get the acquire timeout as a Duration
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    /// Get the idle timeout as a Duration
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    /// Get the maximum lifetime as a Duration if set
    pub fn max_lifetime(&self) -> Option<Duration> {
        self.max_lifetime_ms.map(Duration::from_millis)
    }

    /// Waiting callers limit, `None` when unlimited
    pub fn max_waiting(&self) -> Option<usize> {
        (self.max_waiting > 0).then_some(self.max_waiting)
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("default")
    }
}

impl Default for PoolConfig {
    /// Defaults:
    /// - min_size / max_size: 4
    /// - acquire_timeout: 30 seconds
    /// - idle_timeout: 10 minutes
    /// - max_lifetime: 1 hour
    /// - max_waiting: unlimited
    fn default() -> Self {
        Self::new(4, 4)
    }
}
