//! Error types for dataset loading.

use thiserror::Error;

/// Errors that abort loading a dataset.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The dataset location string could not be interpreted.
    #[error("invalid dataset location '{0}'")]
    InvalidLocation(String),

    /// The store could not be opened.
    #[error("failed to open store: {0}")]
    OpenFailed(String),

    /// The store root holds neither Zarr v2 nor Zarr v3 group metadata.
    #[error("not a Zarr store: {0}")]
    NotAZarrStore(String),

    /// Metadata was present but malformed.
    #[error("invalid Zarr metadata in '{key}': {message}")]
    InvalidMetadata { key: String, message: String },

    /// Storage/IO error.
    #[error("storage error: {0}")]
    Storage(String),
}

impl LoadError {
    /// Create an OpenFailed error.
    pub fn open_failed(msg: impl Into<String>) -> Self {
        Self::OpenFailed(msg.into())
    }

    /// Create an InvalidMetadata error.
    pub fn invalid_metadata(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidMetadata {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a Storage error.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}

impl From<zarrs_storage::StorageError> for LoadError {
    fn from(err: zarrs_storage::StorageError) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoadError>;
