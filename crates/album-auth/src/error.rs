//! Error types for authentication operations.

use thiserror::Error;

/// Errors that can occur during authentication operations.
///
/// Token failures are deliberately coarse: a forged token and one that was
/// never issued both report `TokenUnknown`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The user has no enrolled credential.
    #[error("Unknown identity: {0}")]
    UnknownIdentity(String),

    /// A credential is already enrolled for this user.
    #[error("Credential already enrolled: {0}")]
    DuplicateIdentity(String),

    /// A secret was rejected before hashing.
    #[error("Invalid secret: {reason}")]
    InvalidSecret {
        /// Reason for rejection.
        reason: String,
    },

    /// Token lifetime has elapsed.
    #[error("Token expired")]
    TokenExpired,

    /// Token was never issued by this service or failed authentication.
    #[error("Token unknown")]
    TokenUnknown,

    /// Token was explicitly revoked.
    #[error("Token revoked")]
    TokenRevoked,

    /// Revocation is switched off in configuration.
    #[error("Token revocation is disabled")]
    RevocationDisabled,

    /// The login was verified against a credential that has since been
    /// replaced or withdrawn.
    #[error("Login predates a credential change")]
    StaleLogin,

    /// Bearer string could not be decoded.
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// Key derivation parameters were rejected.
    #[error("Crypto error: {0}")]
    Crypto(#[from] album_crypto::CryptoError),

    /// A lock guarding credential or token state was poisoned.
    #[error("Auth state unavailable: {0}")]
    Storage(String),
}

impl AuthError {
    pub(crate) fn poisoned(what: &str) -> Self {
        AuthError::Storage(format!("{what} lock poisoned"))
    }
}

/// Result type for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;
