//! Error types for protocol operations.

use thiserror::Error;

use album_identity::IdentityError;

/// Errors that can occur while sealing or opening envelopes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Sender or recipient has no registered keys.
    #[error("Unknown identity: {0}")]
    UnknownIdentity(String),

    /// The caller is not the envelope's recipient.
    #[error("Envelope is addressed to another user")]
    RecipientMismatch,

    /// The sender signature does not verify.
    #[error("Envelope signature is invalid")]
    SignatureInvalid,

    /// The ciphertext did not authenticate under the recipient's key.
    #[error("Envelope decryption failed")]
    DecryptionFailed,

    /// Plaintext exceeds the per-message limit.
    #[error("Payload too large: max {max} bytes, got {actual}")]
    PayloadTooLarge {
        /// Maximum allowed size.
        max: usize,
        /// Actual size.
        actual: usize,
    },

    /// Encoded envelope could not be decoded.
    #[error("Malformed envelope: {0}")]
    Malformed(String),

    /// Cryptographic operation failed while sealing.
    #[error("Crypto error: {0}")]
    Crypto(#[from] album_crypto::CryptoError),

    /// The key store could not be accessed.
    #[error("Key store unavailable: {0}")]
    KeyStore(String),
}

impl From<IdentityError> for ProtocolError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::UnknownIdentity(id) => ProtocolError::UnknownIdentity(id),
            IdentityError::Crypto(e) => ProtocolError::Crypto(e),
            other => ProtocolError::KeyStore(other.to_string()),
        }
    }
}

/// Result type for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
