use thiserror::Error;

/// Failures surfaced by a [`crate::storage::StorageBackend`].
///
/// These never leave the storage facade; it logs them and hands the caller a
/// sentinel instead.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage quota exceeded ({needed} bytes needed, {available} available)")]
    QuotaExceeded { needed: usize, available: usize },

    #[error("storage is unavailable")]
    Unavailable,

    #[error("value could not be encoded: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("storage backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid initialization options: {0}")]
    InvalidJson(#[source] serde_json::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,

    #[error("unsupported selector syntax: {0}")]
    Unsupported(String),
}
