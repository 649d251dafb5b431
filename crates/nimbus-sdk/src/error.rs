//! SDK error types

use nimbus_runtime::DataStoreError;
use thiserror::Error;

/// SDK error type
#[derive(Error, Debug)]
pub enum SdkError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Data store error
    #[error("Data store error: {0}")]
    DataStore(#[from] DataStoreError),
}

/// Result type for SDK operations
pub type Result<T> = std::result::Result<T, SdkError>;
