//! Error types for cryptographic operations.

use thiserror::Error;

/// Errors that can occur during cryptographic operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Encryption failed.
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// Decryption failed (tampered ciphertext, wrong key or wrong AAD).
    #[error("Decryption failed: invalid ciphertext or key")]
    Decryption,

    /// Signature verification failed.
    #[error("Signature verification failed")]
    SignatureVerification,

    /// Invalid public key encoding.
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Key agreement produced a non-contributory (all-zero) secret.
    #[error("Key agreement with a low-order point")]
    NonContributory,

    /// Invalid key length.
    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected key length.
        expected: usize,
        /// Actual key length.
        actual: usize,
    },

    /// Invalid nonce length.
    #[error("Invalid nonce length: expected {expected}, got {actual}")]
    InvalidNonceLength {
        /// Expected nonce length.
        expected: usize,
        /// Actual nonce length.
        actual: usize,
    },

    /// Invalid hash or MAC length.
    #[error("Invalid hash length: expected {expected}, got {actual}")]
    InvalidHashLength {
        /// Expected hash length.
        expected: usize,
        /// Actual hash length.
        actual: usize,
    },

    /// Invalid hex string.
    #[error("Invalid hex string: {0}")]
    InvalidHexFormat(String),

    /// Secret hashing failed (bad parameters).
    #[error("Secret hashing failed: {0}")]
    SecretHash(String),
}

/// Result type for cryptographic operations.
pub type Result<T> = std::result::Result<T, CryptoError>;
