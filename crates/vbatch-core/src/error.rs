//! Error types for vbatch

use thiserror::Error;

/// Core error type for vbatch operations
#[derive(Error, Debug)]
pub enum VbatchError {
    #[error("Connection error: {0}")]
    Connection(String),

    /// A statement failed inside the database driver
    #[error("Query error: {0}")]
    Query(String),

    #[error("Driver error: {0}")]
    Driver(String),

    /// The values template is empty or has no recognizable placeholders
    #[error("Template error: {0}")]
    Template(String),

    /// A row, the template and the base query do not fit together
    #[error("Composition mismatch: {0}")]
    Composition(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Settings file error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("{0}")]
    Other(String),
}

impl VbatchError {
    /// Whether the error was raised by the database while running a statement
    pub fn is_database_error(&self) -> bool {
        matches!(self, VbatchError::Query(_))
    }
}

/// Result type alias for vbatch operations
pub type Result<T> = std::result::Result<T, VbatchError>;
