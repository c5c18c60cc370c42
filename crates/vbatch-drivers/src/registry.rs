//! Driver registry for managing available database drivers

use std::collections::HashMap;
use std::sync::Arc;
use vbatch_core::{DatabaseDriver, VbatchError};

/// Registry of available database drivers
pub struct DriverRegistry {
    drivers: HashMap<String, Arc<dyn DatabaseDriver>>,
}

impl DriverRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            drivers: HashMap::new(),
        }
    }

    /// Create a registry with all built-in drivers registered
    pub fn with_defaults() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();

        #[cfg(feature = "sqlite")]
        registry.register(Arc::new(crate::sqlite::SqliteDriver::new()));
        #[cfg(feature = "postgres")]
        registry.register(Arc::new(crate::postgres::PostgresDriver::new()));

        registry
    }

    /// Register a new driver, replacing any driver with the same name
    pub fn register(&mut self, driver: Arc<dyn DatabaseDriver>) {
        let name = driver.name().to_string();
        tracing::info!(driver = %name, "registering database driver");
        self.drivers.insert(name, driver);
    }

    /// Get a driver by name. `postgresql` is accepted as an alias of `postgres`.
    pub fn get(&self, name: &str) -> Option<Arc<dyn DatabaseDriver>> {
        let key = match name.to_lowercase().as_str() {
            "postgresql" | "pg" => "postgres".to_string(),
            "sqlite3" => "sqlite".to_string(),
            other => other.to_string(),
        };
        let driver = self.drivers.get(&key).cloned();
        if driver.is_none() {
            tracing::warn!(driver = %name, "driver not found in registry");
        }
        driver
    }

    /// Like [`get`](Self::get), but an unknown driver is a configuration error
    pub fn require(&self, name: &str) -> Result<Arc<dyn DatabaseDriver>, VbatchError> {
        self.get(name).ok_or_else(|| {
            let mut known = self.list();
            known.sort_unstable();
            VbatchError::Configuration(format!(
                "unknown driver '{}' (available: {})",
                name,
                known.join(", ")
            ))
        })
    }

    /// List all registered driver names
    pub fn list(&self) -> Vec<&str> {
        self.drivers.keys().map(|s| s.as_str()).collect()
    }

    /// Check if a driver is registered
    pub fn has(&self, name: &str) -> bool {
        self.drivers.contains_key(name)
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_registry() {
        let registry = DriverRegistry::new();
        assert!(registry.list().is_empty());
        assert!(registry.get("sqlite").is_none());
    }

    #[cfg(all(feature = "sqlite", feature = "postgres"))]
    #[test]
    fn test_defaults_and_aliases() {
        let registry = DriverRegistry::with_defaults();
        let mut names = registry.list();
        names.sort_unstable();
        assert_eq!(names, vec!["postgres", "sqlite"]);

        assert!(registry.has("sqlite"));
        assert_eq!(registry.get("PostgreSQL").unwrap().name(), "postgres");
        assert_eq!(registry.get("sqlite3").unwrap().name(), "sqlite");
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn test_unknown_driver_is_configuration_error() {
        let registry = DriverRegistry::with_defaults();
        match registry.require("oracle") {
            Err(VbatchError::Configuration(message)) => {
                assert!(message.contains("oracle"));
                assert!(message.contains("sqlite"));
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("oracle should not be registered"),
        }
    }
}
