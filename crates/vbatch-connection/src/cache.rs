//! Keyed cache of pools and connections
//!
//! Pools and single connections are built lazily on first use and shared by
//! every caller asking with the same section and overrides. The cache owns
//! them until [`PoolCache::evict`] or [`PoolCache::close_all`].

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::OnceCell;
use vbatch_core::{Connection, Result, VbatchError};
use vbatch_drivers::DriverRegistry;

use crate::pool::ConnectionPool;
use crate::settings::{ConnectionSection, NodeSettings, SectionKind};
use crate::DriverConnectionFactory;

/// Identity of a cached pool or connection
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    section: SectionKind,
    overrides: Vec<(String, String)>,
}

impl CacheKey {
    /// Overrides are sorted by key so that argument order does not matter.
    /// A repeated key keeps its last value.
    pub fn new<K, V>(section: SectionKind, overrides: &[(K, V)]) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let overrides: BTreeMap<String, String> = overrides
            .iter()
            .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string()))
            .collect();
        Self {
            section,
            overrides: overrides.into_iter().collect(),
        }
    }

    pub fn section(&self) -> SectionKind {
        self.section
    }
}

type Slot<T> = Arc<OnceCell<T>>;

/// Explicitly owned cache of pools and connections for one node
pub struct PoolCache {
    settings: NodeSettings,
    registry: Arc<DriverRegistry>,
    pools: Mutex<HashMap<CacheKey, Slot<Arc<ConnectionPool>>>>,
    connections: Mutex<HashMap<CacheKey, Slot<Arc<dyn Connection>>>>,
}

impl PoolCache {
    pub fn new(settings: NodeSettings, registry: Arc<DriverRegistry>) -> Self {
        Self {
            settings,
            registry,
            pools: Mutex::new(HashMap::new()),
            connections: Mutex::new(HashMap::new()),
        }
    }

    /// Cache for the node named by `PG_NODE`, with the built-in drivers
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(
            NodeSettings::from_env()?,
            Arc::new(DriverRegistry::with_defaults()),
        ))
    }

    pub fn settings(&self) -> &NodeSettings {
        &self.settings
    }

    fn section(&self, key: &CacheKey) -> ConnectionSection {
        self.settings
            .section(key.section)
            .clone()
            .with_overrides(key.overrides.iter().cloned())
    }

    fn factory(&self, section: &ConnectionSection, name: &str) -> Result<DriverConnectionFactory> {
        DriverConnectionFactory::from_registry(&self.registry, section.to_connection_config(name))
    }

    /// The opened pool for the node's `connection_pool` section with `overrides`.
    ///
    /// Concurrent first calls with the same key build a single pool. A failed
    /// build is not cached.
    #[tracing::instrument(skip(self, overrides), fields(node = %self.settings.node()))]
    pub async fn pool<K, V>(&self, overrides: &[(K, V)]) -> Result<Arc<ConnectionPool>>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let key = CacheKey::new(SectionKind::ConnectionPool, overrides);
        let slot = Arc::clone(self.pools.lock().entry(key.clone()).or_default());

        slot.get_or_try_init(|| async {
            let section = self.section(&key);
            let config = section.pool_config()?;
            let factory = self.factory(&section, config.name())?;

            let pool = Arc::new(ConnectionPool::new(config, factory));
            pool.open().await?;
            tracing::info!(pool = %pool.config().name(), "created connection pool");
            Ok::<_, VbatchError>(pool)
        })
        .await
        .cloned()
    }

    /// The shared single connection for the node's `connection` section with
    /// `overrides`. A cached connection that has been closed is replaced.
    #[tracing::instrument(skip(self, overrides), fields(node = %self.settings.node()))]
    pub async fn connect<K, V>(&self, overrides: &[(K, V)]) -> Result<Arc<dyn Connection>>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let key = CacheKey::new(SectionKind::Connection, overrides);

        loop {
            let slot = Arc::clone(self.connections.lock().entry(key.clone()).or_default());

            let conn = slot
                .get_or_try_init(|| async {
                    let section = self.section(&key);
                    let factory = self.factory(&section, self.settings.node())?;
                    crate::ConnectionFactory::create(&factory).await
                })
                .await?
                .clone();

            if !conn.is_closed() {
                return Ok(conn);
            }

            tracing::debug!("cached connection was closed, reconnecting");
            let mut connections = self.connections.lock();
            if connections
                .get(&key)
                .is_some_and(|current| Arc::ptr_eq(current, &slot))
            {
                connections.remove(&key);
            }
        }
    }

    /// Drop the cached pool or connection under `key`, closing it
    pub async fn evict(&self, key: &CacheKey) -> bool {
        match key.section {
            SectionKind::ConnectionPool => {
                let slot = self.pools.lock().remove(key);
                match slot.and_then(|slot| slot.get().cloned()) {
                    Some(pool) => {
                        pool.close().await;
                        true
                    }
                    None => false,
                }
            }
            SectionKind::Connection => {
                let slot = self.connections.lock().remove(key);
                match slot.and_then(|slot| slot.get().cloned()) {
                    Some(conn) => {
                        if let Err(e) = conn.close().await {
                            tracing::warn!(error = %e, "failed to close evicted connection");
                        }
                        true
                    }
                    None => false,
                }
            }
        }
    }

    /// Number of built pools and connections
    pub fn len(&self) -> usize {
        let pools = self.pools.lock().values().filter(|s| s.initialized()).count();
        let connections = self
            .connections
            .lock()
            .values()
            .filter(|s| s.initialized())
            .count();
        pools + connections
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Close and forget every cached pool and connection
    #[tracing::instrument(skip(self), fields(node = %self.settings.node()))]
    pub async fn close_all(&self) {
        let pools: Vec<_> = self
            .pools
            .lock()
            .drain()
            .filter_map(|(_, slot)| slot.get().cloned())
            .collect();
        let connections: Vec<_> = self
            .connections
            .lock()
            .drain()
            .filter_map(|(_, slot)| slot.get().cloned())
            .collect();

        tracing::info!(
            pools = pools.len(),
            connections = connections.len(),
            "closing cached pools and connections"
        );

        for pool in pools {
            pool.close().await;
        }
        for conn in connections {
            if let Err(e) = conn.close().await {
                tracing::warn!(error = %e, "failed to close cached connection");
            }
        }
    }
}
