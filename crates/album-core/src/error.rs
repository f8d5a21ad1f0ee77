//! Error types for the messaging service.
//!
//! Lower-level errors are folded into one flat taxonomy callers can match on.
//! Login failures are always `InvalidCredential`, whichever part was wrong.

use thiserror::Error;

use album_auth::AuthError;
use album_identity::IdentityError;
use album_protocol::ProtocolError;
use album_store::StoreError;

use crate::config::ConfigError;

/// Errors returned by [`crate::AlbumService`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// No such user.
    #[error("Unknown identity: {0}")]
    UnknownIdentity(String),

    /// User already exists.
    #[error("Identity already exists: {0}")]
    DuplicateIdentity(String),

    /// Login rejected.
    #[error("Invalid credential")]
    InvalidCredential,

    /// Session token has expired; log in again.
    #[error("Token expired")]
    TokenExpired,

    /// Session token was not issued by this service.
    #[error("Token unknown")]
    TokenUnknown,

    /// Session token was revoked.
    #[error("Token revoked")]
    TokenRevoked,

    /// Envelope signature does not verify.
    #[error("Signature invalid")]
    SignatureInvalid,

    /// Envelope ciphertext did not authenticate.
    #[error("Decryption failed")]
    DecryptionFailed,

    /// Envelope is addressed to another user.
    #[error("Recipient mismatch")]
    RecipientMismatch,

    /// Message exceeds the plaintext limit.
    #[error("Payload too large: max {max} bytes, got {actual}")]
    PayloadTooLarge {
        /// Maximum allowed size.
        max: usize,
        /// Actual size.
        actual: usize,
    },

    /// Token revocation is switched off.
    #[error("Token revocation is disabled")]
    RevocationDisabled,

    /// Malformed request input, such as an invalid user id.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Key store, credential store or envelope store failure.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl CoreError {
    /// Whether the caller can reasonably retry: after logging in again for
    /// `TokenExpired`, or later for `ServiceUnavailable`. Cryptographic
    /// failures are never recoverable.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CoreError::TokenExpired | CoreError::ServiceUnavailable(_))
    }
}

impl From<AuthError> for CoreError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::UnknownIdentity(id) => CoreError::UnknownIdentity(id),
            AuthError::DuplicateIdentity(id) => CoreError::DuplicateIdentity(id),
            AuthError::InvalidSecret { reason } => CoreError::InvalidRequest(reason),
            AuthError::TokenExpired => CoreError::TokenExpired,
            AuthError::TokenUnknown | AuthError::MalformedToken(_) => CoreError::TokenUnknown,
            AuthError::TokenRevoked => CoreError::TokenRevoked,
            AuthError::RevocationDisabled => CoreError::RevocationDisabled,
            AuthError::StaleLogin => CoreError::InvalidCredential,
            AuthError::Crypto(e) => CoreError::ServiceUnavailable(e.to_string()),
            AuthError::Storage(msg) => CoreError::ServiceUnavailable(msg),
        }
    }
}

impl From<IdentityError> for CoreError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::UnknownIdentity(id) => CoreError::UnknownIdentity(id),
            IdentityError::DuplicateIdentity(id) => CoreError::DuplicateIdentity(id),
            IdentityError::InvalidUserId { reason } => CoreError::InvalidRequest(reason),
            IdentityError::Crypto(e) => CoreError::ServiceUnavailable(e.to_string()),
            IdentityError::Storage(msg) => CoreError::ServiceUnavailable(msg),
        }
    }
}

impl From<ProtocolError> for CoreError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::UnknownIdentity(id) => CoreError::UnknownIdentity(id),
            ProtocolError::RecipientMismatch => CoreError::RecipientMismatch,
            ProtocolError::SignatureInvalid => CoreError::SignatureInvalid,
            ProtocolError::DecryptionFailed => CoreError::DecryptionFailed,
            ProtocolError::PayloadTooLarge { max, actual } => {
                CoreError::PayloadTooLarge { max, actual }
            }
            ProtocolError::Malformed(msg) => CoreError::InvalidRequest(msg),
            ProtocolError::Crypto(e) => CoreError::ServiceUnavailable(e.to_string()),
            ProtocolError::KeyStore(msg) => CoreError::ServiceUnavailable(msg),
        }
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        CoreError::ServiceUnavailable(err.to_string())
    }
}

/// Result type for service operations.
pub type Result<T> = std::result::Result<T, CoreError>;
