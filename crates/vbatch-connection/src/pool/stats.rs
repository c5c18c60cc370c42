//! Pool statistics types

use serde::{Deserialize, Serialize};

/// Snapshot of a connection pool's state and lifetime counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PoolStats {
    /// Number of idle connections available in the pool
    pub idle: usize,
    /// Number of connections currently borrowed
    pub active: usize,
    /// Number of callers waiting for a connection
    pub waiting: usize,
    /// Configured upper bound on open connections
    pub max_size: usize,
    /// Connections opened by the factory since the pool was created
    pub connections_created: u64,
    /// Connections closed because they expired or failed validation
    pub connections_discarded: u64,
    /// Acquire attempts that ran out of time
    pub requests_timed_out: u64,
    /// Acquire attempts refused because too many callers were queued
    pub requests_rejected: u64,
}

impl PoolStats {
    /// Total number of open connections (idle + active)
    pub fn total(&self) -> usize {
        self.idle + self.active
    }

    /// Share of the pool's capacity currently borrowed (0.0 to 1.0)
    pub fn utilization(&self) -> f64 {
        if self.max_size == 0 {
            0.0
        } else {
            self.active as f64 / self.max_size as f64
        }
    }

    /// Whether every connection the pool may open is borrowed
    pub fn is_exhausted(&self) -> bool {
        self.max_size > 0 && self.active >= self.max_size
    }
}
