//! Error types for envelope storage.

use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// An envelope with this id is already stored for the recipient.
    #[error("Duplicate envelope: {0}")]
    Duplicate(String),

    /// The backing database failed.
    #[error("Database error: {0}")]
    Database(String),

    /// A stored record could not be decoded.
    #[error("Corrupted record: {0}")]
    Corrupted(String),

    /// An envelope could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A lock guarding in-memory state was poisoned.
    #[error("Store lock poisoned")]
    Poisoned,
}

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;
