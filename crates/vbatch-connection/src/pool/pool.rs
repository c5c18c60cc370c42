//! Connection pool implementation

use std::collections::VecDeque;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use vbatch_core::{Connection, Result, VbatchError};

use super::config::PoolConfig;
use super::stats::PoolStats;
use crate::ConnectionFactory;

/// A connection with the bookkeeping needed for lifetime and idle expiry
struct PoolEntry {
    connection: Arc<dyn Connection>,
    created_at: Instant,
    last_used_at: Instant,
}

impl PoolEntry {
    fn new(connection: Arc<dyn Connection>) -> Self {
        let now = Instant::now();
        Self {
            connection,
            created_at: now,
            last_used_at: now,
        }
    }

    fn touch(&mut self) {
        self.last_used_at = Instant::now();
    }
}

#[derive(Default)]
struct Counters {
    created: AtomicU64,
    discarded: AtomicU64,
    timed_out: AtomicU64,
    rejected: AtomicU64,
}

/// Decrements the waiting counter when the caller stops waiting
struct WaitingGuard<'a>(&'a AtomicUsize);

impl Drop for WaitingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A connection pool that manages a set of database connections
///
/// At most `max_size` connections are borrowed at once. Connections are
/// returned to the pool when the `PooledConnection` wrapper is dropped, and
/// are recycled once they exceed their lifetime or sit idle too long.
pub struct ConnectionPool {
    config: PoolConfig,
    factory: Arc<dyn ConnectionFactory>,
    idle: Mutex<VecDeque<PoolEntry>>,
    /// Permits bound the number of borrowed connections
    semaphore: Arc<Semaphore>,
    active_count: AtomicUsize,
    waiting_count: AtomicUsize,
    closed: AtomicBool,
    counters: Counters,
}

impl ConnectionPool {
    /// Create a new connection pool with the given configuration and factory.
    ///
    /// No connection is opened until [`open`](Self::open) or the first
    /// [`get`](Self::get).
    pub fn new<F: ConnectionFactory>(config: PoolConfig, factory: F) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_size()));
        Self {
            config,
            factory: Arc::new(factory),
            idle: Mutex::new(VecDeque::new()),
            semaphore,
            active_count: AtomicUsize::new(0),
            waiting_count: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            counters: Counters::default(),
        }
    }

    /// Open connections until the pool holds `min_size` of them
    #[tracing::instrument(skip(self), fields(pool = %self.config.name(), min_size = self.config.min_size()))]
    pub async fn open(&self) -> Result<()> {
        self.ensure_open()?;

        let missing = self
            .config
            .min_size()
            .saturating_sub(self.idle.lock().len() + self.active_count.load(Ordering::SeqCst));

        for _ in 0..missing {
            let entry = self.create_entry().await?;
            self.idle.lock().push_back(entry);
        }

        tracing::info!(opened = missing, "connection pool ready");
        Ok(())
    }

    /// Get a connection from the pool
    ///
    /// This will:
    /// 1. Refuse the request when `max_waiting` callers are already queued
    /// 2. Wait for a free slot (at most `max_size` connections are borrowed)
    /// 3. Reuse a valid idle connection, or create a new one
    ///
    /// Returns a `Timeout` error if the acquire timeout is exceeded.
    #[tracing::instrument(skip(self), fields(pool = %self.config.name()))]
    pub async fn get(&self) -> Result<PooledConnection<'_>> {
        self.ensure_open()?;
        let waiting = self.enter_queue()?;

        let result = tokio::time::timeout(self.config.acquire_timeout(), async {
            let permit = self
                .semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| VbatchError::Connection("Connection pool is closed".into()))?;

            let entry = match self.take_idle().await {
                Some(entry) => entry,
                None => self.create_entry().await?,
            };

            Ok::<_, VbatchError>((permit, entry))
        })
        .await;
        drop(waiting);

        match result {
            Ok(Ok((permit, entry))) => {
                self.active_count.fetch_add(1, Ordering::SeqCst);
                Ok(PooledConnection {
                    entry: Some(entry),
                    pool: self,
                    _permit: permit,
                })
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                self.counters.timed_out.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(timeout = ?self.config.acquire_timeout(), "timed out waiting for connection");
                Err(VbatchError::Timeout(format!(
                    "Timed out waiting for connection (timeout: {:?})",
                    self.config.acquire_timeout()
                )))
            }
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(VbatchError::Connection(format!(
                "Connection pool '{}' is closed",
                self.config.name()
            )));
        }
        Ok(())
    }

    /// Register the caller as waiting, unless the queue is already full
    fn enter_queue(&self) -> Result<WaitingGuard<'_>> {
        let already_waiting = self.waiting_count.fetch_add(1, Ordering::SeqCst);
        let guard = WaitingGuard(&self.waiting_count);

        if let Some(max_waiting) = self.config.max_waiting()
            && already_waiting >= max_waiting
            && self.semaphore.available_permits() == 0
        {
            self.counters.rejected.fetch_add(1, Ordering::Relaxed);
            return Err(VbatchError::Connection(format!(
                "Connection pool '{}' already has {} requests waiting",
                self.config.name(),
                already_waiting
            )));
        }

        Ok(guard)
    }

    async fn create_entry(&self) -> Result<PoolEntry> {
        let connection = self.factory.create().await?;
        self.counters.created.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("opened pooled connection");
        Ok(PoolEntry::new(connection))
    }

    fn is_expired(&self, entry: &PoolEntry) -> bool {
        self.config
            .max_lifetime()
            .is_some_and(|max_lifetime| entry.created_at.elapsed() > max_lifetime)
    }

    /// Pop idle connections until one passes lifetime, idle and validation checks
    async fn take_idle(&self) -> Option<PoolEntry> {
        loop {
            let mut entry = { self.idle.lock().pop_front() }?;

            let reason = if self.is_expired(&entry) {
                Some("max lifetime exceeded")
            } else if entry.last_used_at.elapsed() > self.config.idle_timeout() {
                Some("idle timeout exceeded")
            } else if !self.factory.validate(&*entry.connection).await {
                Some("validation failed")
            } else {
                None
            };

            match reason {
                Some(reason) => {
                    tracing::debug!(reason, "discarding pooled connection");
                    self.counters.discarded.fetch_add(1, Ordering::Relaxed);
                    if let Err(e) = entry.connection.close().await {
                        tracing::warn!(error = %e, "failed to close discarded connection");
                    }
                }
                None => {
                    entry.touch();
                    return Some(entry);
                }
            }
        }
    }

    /// Return a connection to the pool
    fn return_entry(&self, mut entry: PoolEntry) {
        self.active_count.fetch_sub(1, Ordering::SeqCst);

        // Dropping the last reference closes the connection
        if self.is_closed() || entry.connection.is_closed() {
            return;
        }
        if self.is_expired(&entry) {
            self.counters.discarded.fetch_add(1, Ordering::Relaxed);
            return;
        }

        entry.touch();
        self.idle.lock().push_back(entry);
    }

    /// Get current pool statistics
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            idle: self.idle.lock().len(),
            active: self.active_count.load(Ordering::SeqCst),
            waiting: self.waiting_count.load(Ordering::SeqCst),
            max_size: self.config.max_size(),
            connections_created: self.counters.created.load(Ordering::Relaxed),
            connections_discarded: self.counters.discarded.load(Ordering::Relaxed),
            requests_timed_out: self.counters.timed_out.load(Ordering::Relaxed),
            requests_rejected: self.counters.rejected.load(Ordering::Relaxed),
        }
    }

    /// Get the pool configuration
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Close all idle connections in the pool
    pub async fn close_idle(&self) {
        let entries: Vec<_> = {
            let mut idle = self.idle.lock();
            idle.drain(..).collect()
        };

        for entry in entries {
            if let Err(e) = entry.connection.close().await {
                tracing::warn!(error = %e, "failed to close idle connection");
            }
        }
    }

    /// Refuse new requests and close idle connections.
    ///
    /// Borrowed connections are closed when they are returned.
    #[tracing::instrument(skip(self), fields(pool = %self.config.name()))]
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.semaphore.close();
        self.close_idle().await;
        tracing::info!("connection pool closed");
    }
}

/// A connection borrowed from the pool
///
/// When dropped, the connection is automatically returned to the pool.
pub struct PooledConnection<'a> {
    entry: Option<PoolEntry>,
    pool: &'a ConnectionPool,
    _permit: OwnedSemaphorePermit,
}

impl Deref for PooledConnection<'_> {
    type Target = dyn Connection;

    fn deref(&self) -> &Self::Target {
        self.inner().as_ref()
    }
}

impl Drop for PooledConnection<'_> {
    fn drop(&mut self) {
        if let Some(entry) = self.entry.take() {
            self.pool.return_entry(entry);
        }
    }
}

impl PooledConnection<'_> {
    /// Get the underlying connection as an Arc
    pub fn inner(&self) -> &Arc<dyn Connection> {
        &self.entry.as_ref().expect("connection taken").connection
    }
}
