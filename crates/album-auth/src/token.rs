//! Session tokens.
//!
//! A token carries its claims in the clear (subject, issue and expiry time, a
//! random nonce) plus a BLAKE3 keyed MAC over those claims. The MAC key never
//! leaves the issuing service, so a token that fails the MAC was not issued
//! here. Validity beyond that (revocation, expiry) is decided by the
//! validator against the registry and the clock on every request.
//!
//! The opaque bearer form handed to clients is lowercase hex of the bincode
//! encoding.

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use album_crypto::Hash256;
use album_identity::UserId;

use crate::{AuthError, Result};

/// Size of the per-token random nonce.
pub const TOKEN_NONCE_SIZE: usize = 32;

/// Maximum accepted bearer string length in characters.
pub const MAX_BEARER_LEN: usize = 1024;

/// Domain separator for token MACs.
const TOKEN_MAC_DOMAIN: &[u8] = b"album-session-token-mac-v1";

/// Secret key that authenticates issued tokens.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct TokenKey([u8; 32]);

impl TokenKey {
    /// Generate a random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    fn mac(
        &self,
        subject: &UserId,
        issued_at: u64,
        expires_at: u64,
        nonce: &[u8; TOKEN_NONCE_SIZE],
    ) -> Hash256 {
        let subject = subject.as_str().as_bytes();
        let mut input =
            Vec::with_capacity(TOKEN_MAC_DOMAIN.len() + 8 + subject.len() + 16 + TOKEN_NONCE_SIZE);
        input.extend_from_slice(TOKEN_MAC_DOMAIN);
        input.extend_from_slice(&(subject.len() as u64).to_be_bytes());
        input.extend_from_slice(subject);
        input.extend_from_slice(&issued_at.to_be_bytes());
        input.extend_from_slice(&expires_at.to_be_bytes());
        input.extend_from_slice(nonce);
        Hash256::keyed_hash(&self.0, &input)
    }
}

impl std::fmt::Debug for TokenKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TokenKey([REDACTED])")
    }
}

/// An issued session token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToken {
    subject: UserId,
    issued_at: u64,
    expires_at: u64,
    nonce: [u8; TOKEN_NONCE_SIZE],
    tag: Hash256,
}

impl SessionToken {
    pub(crate) fn mint(key: &TokenKey, subject: UserId, issued_at: u64, ttl_secs: u64) -> Self {
        let mut nonce = [0u8; TOKEN_NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce);
        let expires_at = issued_at.saturating_add(ttl_secs);
        let tag = key.mac(&subject, issued_at, expires_at, &nonce);
        Self {
            subject,
            issued_at,
            expires_at,
            nonce,
            tag,
        }
    }

    /// Whether the MAC matches the claims under `key`. Constant time.
    pub(crate) fn authenticates(&self, key: &TokenKey) -> bool {
        key.mac(&self.subject, self.issued_at, self.expires_at, &self.nonce) == self.tag
    }

    /// The user this token was issued to.
    pub fn subject(&self) -> &UserId {
        &self.subject
    }

    /// Issue time (Unix seconds).
    pub fn issued_at(&self) -> u64 {
        self.issued_at
    }

    /// Expiry time (Unix seconds). The token is invalid from this instant on.
    pub fn expires_at(&self) -> u64 {
        self.expires_at
    }

    /// Per-token random nonce, also the token's registry key.
    pub fn nonce(&self) -> &[u8; TOKEN_NONCE_SIZE] {
        &self.nonce
    }

    /// Encode as an opaque bearer string.
    pub fn to_bearer(&self) -> Result<String> {
        let bytes =
            bincode::serialize(self).map_err(|e| AuthError::MalformedToken(e.to_string()))?;
        Ok(hex::encode(bytes))
    }

    /// Decode a bearer string produced by [`SessionToken::to_bearer`].
    ///
    /// Decoding checks structure only; use the validator to check the token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MalformedToken` for oversize, non-hex or
    /// structurally invalid input.
    pub fn from_bearer(bearer: &str) -> Result<Self> {
        if bearer.len() > MAX_BEARER_LEN {
            return Err(AuthError::MalformedToken(format!(
                "bearer longer than {} characters",
                MAX_BEARER_LEN
            )));
        }
        let bytes = hex::decode(bearer).map_err(|e| AuthError::MalformedToken(e.to_string()))?;
        bincode::deserialize(&bytes).map_err(|e| AuthError::MalformedToken(e.to_string()))
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionToken")
            .field("subject", &self.subject)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .field("nonce", &"[REDACTED]")
            .finish()
    }
}
