//! Error types for identity operations.

use thiserror::Error;

/// Errors that can occur during identity operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// Cryptographic operation failed.
    #[error("Crypto error: {0}")]
    Crypto(#[from] album_crypto::CryptoError),

    /// No identity registered under this id.
    #[error("Unknown identity: {0}")]
    UnknownIdentity(String),

    /// An identity is already registered under this id.
    #[error("Identity already exists: {0}")]
    DuplicateIdentity(String),

    /// Malformed user id.
    #[error("Invalid user id: {reason}")]
    InvalidUserId {
        /// Reason for invalidity.
        reason: String,
    },

    /// The key store itself could not be accessed.
    #[error("Key store unavailable: {0}")]
    Storage(String),
}

/// Result type for identity operations.
pub type Result<T> = std::result::Result<T, IdentityError>;
