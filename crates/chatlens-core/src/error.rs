use thiserror::Error;

/// Top-level error type for the chatlens system.
///
/// Subsystem crates define their own error types and convert into
/// `ChatlensError` where they cross a crate boundary, so that `?` works
/// through the record store, transport and configuration layers.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ChatlensError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid sentiment label: {0}")]
    InvalidLabel(String),

    #[error("Shutdown in progress")]
    ShuttingDown,
}

impl From<toml::de::Error> for ChatlensError {
    fn from(err: toml::de::Error) -> Self {
        ChatlensError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ChatlensError {
    fn from(err: toml::ser::Error) -> Self {
        ChatlensError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ChatlensError {
    fn from(err: serde_json::Error) -> Self {
        ChatlensError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for chatlens operations.
pub type Result<T> = std::result::Result<T, ChatlensError>;
