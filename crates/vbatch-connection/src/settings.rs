//! Node settings
//!
//! Connection parameters live in a TOML file with one top-level table per
//! node. Each node has a `connection` section for single connections and a
//! `connection_pool` section for pools:
//!
//! ```toml
//! [analytics.connection]
//! driver = "postgres"
//! host = "db.internal"
//! dbname = "warehouse"
//! user = "loader"
//! sslmode = "require"
//!
//! [analytics.connection_pool]
//! host = "db.internal"
//! dbname = "warehouse"
//! user = "loader"
//! min_size = 4
//! max_size = 16
//! ```
//!
//! The node is picked by `PG_NODE`. The file is `VBATCH_CONFIG` when set,
//! otherwise the nearest `project.toml` above the working directory.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use vbatch_core::{ConnectionConfig, Result, VbatchError};

use crate::pool::PoolConfig;

/// Environment variable naming the node to use
pub const NODE_ENV: &str = "PG_NODE";
/// Environment variable pointing at the settings file
pub const CONFIG_ENV: &str = "VBATCH_CONFIG";
/// Settings file looked up from the working directory upwards
pub const PROJECT_FILE: &str = "project.toml";

const DEFAULT_DRIVER: &str = "postgres";

/// Keys that configure the pool itself and are never sent to the server
const POOL_KEYS: &[&str] = &[
    "min_size",
    "max_size",
    "timeout_ms",
    "max_waiting",
    "max_lifetime_ms",
    "max_idle_ms",
    "name",
];

/// Which section of a node a connection is built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SectionKind {
    Connection,
    ConnectionPool,
}

impl SectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::Connection => "connection",
            SectionKind::ConnectionPool => "connection_pool",
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flat key/value parameters of one settings section
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionSection {
    params: BTreeMap<String, String>,
}

impl ConnectionSection {
    /// Build a section from a TOML table of scalar values
    pub fn from_table(table: &toml::Table) -> Result<Self> {
        let params = table
            .iter()
            .map(|(key, value)| {
                let text = match value {
                    toml::Value::String(s) => s.clone(),
                    toml::Value::Integer(i) => i.to_string(),
                    toml::Value::Float(f) => f.to_string(),
                    toml::Value::Boolean(b) => b.to_string(),
                    other => {
                        return Err(VbatchError::Configuration(format!(
                            "setting `{}` must be a scalar, found {}",
                            key,
                            other.type_str()
                        )));
                    }
                };
                Ok((key.clone(), text))
            })
            .collect::<Result<_>>()?;

        Ok(Self { params })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Set or replace one parameter
    pub fn with_override(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Merge caller overrides over the file's values
    pub fn with_overrides<I, K, V>(self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        overrides
            .into_iter()
            .fold(self, |section, (key, value)| section.with_override(key, value))
    }

    /// Driver name, `postgres` unless the section says otherwise
    pub fn driver(&self) -> &str {
        self.get("driver").unwrap_or(DEFAULT_DRIVER)
    }

    /// Parameters sent to the driver, without `driver` and pool keys
    fn connection_params(&self) -> impl Iterator<Item = (&String, &String)> {
        self.params
            .iter()
            .filter(|(key, _)| key.as_str() != "driver" && !POOL_KEYS.contains(&key.as_str()))
    }

    /// Render as a libpq conninfo string: `host=db port=5432 dbname=app`
    pub fn to_conninfo(&self) -> String {
        self.connection_params()
            .map(|(key, value)| format!("{}={}", key, quote_conninfo_value(value)))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Connection configuration for the section's driver
    pub fn to_connection_config(&self, name: &str) -> ConnectionConfig {
        self.connection_params().fold(
            ConnectionConfig::new(self.driver(), name),
            |config, (key, value)| config.with_param(key, value.as_str()),
        )
    }

    /// Pool configuration from the pool keys, with defaults for missing ones
    pub fn pool_config(&self) -> Result<PoolConfig> {
        let defaults = PoolConfig::default();
        let min_size = self.parse_key("min_size")?.unwrap_or(defaults.min_size());
        let max_size = self.parse_key("max_size")?.unwrap_or(min_size.max(1));

        let mut config = PoolConfig::try_new(min_size, max_size)?
            .with_acquire_timeout_ms(self.parse_key("timeout_ms")?.unwrap_or(30_000))
            .with_idle_timeout_ms(self.parse_key("max_idle_ms")?.unwrap_or(600_000))
            .with_max_lifetime_ms(self.parse_key("max_lifetime_ms")?.unwrap_or(3_600_000))
            .with_max_waiting(self.parse_key("max_waiting")?.unwrap_or(0));

        if let Some(name) = self.get("name") {
            config = config.with_name(name);
        }
        Ok(config)
    }

    fn parse_key<T: std::str::FromStr>(&self, key: &str) -> Result<Option<T>> {
        self.get(key)
            .map(|raw| {
                raw.trim().parse().map_err(|_| {
                    VbatchError::Configuration(format!("invalid value for `{}`: '{}'", key, raw))
                })
            })
            .transpose()
    }

    /// Stable, ordered view of every parameter
    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }
}

/// Quote a conninfo value when it is empty or has spaces, quotes or backslashes
fn quote_conninfo_value(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || c == '\'' || c == '\\');
    if !needs_quotes {
        return value.to_string();
    }

    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{}'", escaped)
}

#[derive(Deserialize)]
struct NodeTables {
    #[serde(default)]
    connection: Option<toml::Table>,
    #[serde(default)]
    connection_pool: Option<toml::Table>,
}

/// Settings of one node
#[derive(Debug, Clone)]
pub struct NodeSettings {
    node: String,
    source: Option<PathBuf>,
    connection: ConnectionSection,
    connection_pool: ConnectionSection,
}

impl NodeSettings {
    /// Read `node` from the settings file at `path`
    #[tracing::instrument(skip(path), fields(path = %path.display()))]
    pub fn load(path: &Path, node: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            VbatchError::Configuration(format!(
                "cannot read settings file {}: {}",
                path.display(),
                e
            ))
        })?;

        let mut settings = Self::from_toml_str(&contents, node)?;
        settings.source = Some(path.to_path_buf());
        tracing::debug!(node, driver = settings.connection.driver(), "loaded node settings");
        Ok(settings)
    }

    /// Parse `node` out of a settings document.
    ///
    /// A node without a `connection_pool` section uses its `connection`
    /// section for pools too.
    pub fn from_toml_str(contents: &str, node: &str) -> Result<Self> {
        let document: toml::Table = contents.parse()?;
        let node_value = document.get(node).cloned().ok_or_else(|| {
            VbatchError::Configuration(format!("node `{}` not found in settings", node))
        })?;
        let tables: NodeTables = node_value.try_into()?;

        let connection = tables
            .connection
            .as_ref()
            .map(ConnectionSection::from_table)
            .transpose()?;
        let connection_pool = tables
            .connection_pool
            .as_ref()
            .map(ConnectionSection::from_table)
            .transpose()?;

        let (connection, connection_pool) = match (connection, connection_pool) {
            (None, None) => {
                return Err(VbatchError::Configuration(format!(
                    "node `{}` has neither a `connection` nor a `connection_pool` section",
                    node
                )));
            }
            (Some(connection), None) => (connection.clone(), connection),
            (None, Some(pool)) => (pool.clone(), pool),
            (Some(connection), Some(pool)) => (connection, pool),
        };

        Ok(Self {
            node: node.to_string(),
            source: None,
            connection,
            connection_pool,
        })
    }

    /// Settings for the node named by `PG_NODE`.
    ///
    /// `PG_NODE` must be set. The file comes from `VBATCH_CONFIG`, or the
    /// nearest `project.toml` from the working directory upwards.
    pub fn from_env() -> Result<Self> {
        let cwd = std::env::current_dir()?;
        Self::resolve(
            std::env::var(NODE_ENV).ok(),
            std::env::var_os(CONFIG_ENV).map(PathBuf::from),
            &cwd,
        )
    }

    /// Settings for `node` from `explicit_path`, or from the nearest
    /// `project.toml` at or above `cwd`. A missing node is an error.
    pub fn resolve(
        node: Option<String>,
        explicit_path: Option<PathBuf>,
        cwd: &Path,
    ) -> Result<Self> {
        let node = node.filter(|n| !n.trim().is_empty()).ok_or_else(|| {
            VbatchError::Configuration(format!("{} must be set to the node to use", NODE_ENV))
        })?;

        let path = match explicit_path {
            Some(path) => path,
            None => find_project_file(cwd).ok_or_else(|| {
                VbatchError::Configuration(format!(
                    "no {} found in {} or its parents (set {})",
                    PROJECT_FILE,
                    cwd.display(),
                    CONFIG_ENV
                ))
            })?,
        };

        Self::load(&path, &node)
    }

    pub fn node(&self) -> &str {
        &self.node
    }

    /// File the settings were read from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn connection(&self) -> &ConnectionSection {
        &self.connection
    }

    pub fn connection_pool(&self) -> &ConnectionSection {
        &self.connection_pool
    }

    pub fn section(&self, kind: SectionKind) -> &ConnectionSection {
        match kind {
            SectionKind::Connection => &self.connection,
            SectionKind::ConnectionPool => &self.connection_pool,
        }
    }
}

/// Walk up from `start` looking for `project.toml`
pub fn find_project_file(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(PROJECT_FILE))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests;
