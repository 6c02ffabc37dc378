//! Error types for the proxyauth daemon.

use proxyauth::{CipherError, StoreError};
use thiserror::Error;

/// Errors that can occur in the daemon.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// I/O error (file operations, socket communication).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML deserialization error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Credential file error.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Master key or encryption error.
    #[error("Cipher error: {0}")]
    Cipher(String),

    /// Generic error with context.
    #[error("{0}")]
    Other(String),
}

/// Result type alias using `DaemonError`.
pub type Result<T> = std::result::Result<T, DaemonError>;

impl From<anyhow::Error> for DaemonError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<DaemonError> for StoreError {
    fn from(err: DaemonError) -> Self {
        match err {
            DaemonError::Io(e) => Self::Io(e),
            other => Self::Backend(other.to_string()),
        }
    }
}

impl From<CipherError> for DaemonError {
    fn from(err: CipherError) -> Self {
        Self::Cipher(err.to_string())
    }
}
