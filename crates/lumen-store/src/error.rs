//! Error types for lumen-store.

use std::path::PathBuf;

/// Result type for lumen-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in lumen-store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A binding is missing one of its two endpoints.
    #[error("Binding for {0} is incomplete: both endpoints must be set")]
    IncompleteBinding(String),

    /// The binding was filed under a key other than its own device id.
    #[error("Binding for {device_id} cannot be stored under {key}")]
    BindingMismatch { key: String, device_id: String },

    /// An operation on the current device was attempted with none selected.
    #[error("No active device")]
    NoActiveDevice,

    /// Storage key contains characters that cannot be used as a file name.
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    /// Failed to create the data directory.
    #[error("Failed to create data directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Reading or writing a storage file failed.
    #[error("Storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
