//! Error types for configuration and persistence.

use thiserror::Error;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found.
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    /// Failed to read or write a configuration file.
    #[error("Failed to access configuration file: {0}")]
    Io(String),

    /// Failed to parse a configuration file.
    #[error("Failed to parse configuration file: {0}")]
    Parse(String),

    /// A value is present but unusable.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Errors from the snapshot store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure.
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored blob could not be encoded or decoded.
    #[error("Snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Key is empty after sanitizing.
    #[error("Invalid snapshot key: {0:?}")]
    InvalidKey(String),

    /// No snapshot under this key.
    #[error("Snapshot not found: {0}")]
    NotFound(String),
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
