//! X25519 key agreement.
//!
//! Long-term encryption keys are static X25519 secrets held by the identity
//! key store; every message uses a fresh ephemeral secret on the sender side.
//!
//! ## Security Notes
//!
//! - Secret keys are zeroized on drop and are not `Clone`
//! - Non-contributory results (low-order peer points) are rejected
//! - Shared secrets are only exposed through BLAKE3 key derivation

use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{CryptoError, Result};

/// Size of an X25519 public key in bytes.
pub const PUBLIC_KEY_SIZE: usize = 32;

/// X25519 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExchangePublicKey([u8; PUBLIC_KEY_SIZE]);

impl ExchangePublicKey {
    /// Create from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; PUBLIC_KEY_SIZE] =
            bytes
                .try_into()
                .map_err(|_| CryptoError::InvalidKeyLength {
                    expected: PUBLIC_KEY_SIZE,
                    actual: bytes.len(),
                })?;
        Ok(Self(arr))
    }

    /// Get the key bytes.
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.0
    }

    /// Mutable access to the key bytes.
    pub fn as_mut_bytes(&mut self) -> &mut [u8; PUBLIC_KEY_SIZE] {
        &mut self.0
    }
}

impl std::fmt::Debug for ExchangePublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ExchangePublicKey({}..)", hex::encode(&self.0[..4]))
    }
}

impl From<PublicKey> for ExchangePublicKey {
    fn from(key: PublicKey) -> Self {
        Self(key.to_bytes())
    }
}

impl From<&ExchangePublicKey> for PublicKey {
    fn from(key: &ExchangePublicKey) -> Self {
        PublicKey::from(key.0)
    }
}

/// Long-term X25519 secret key.
#[derive(ZeroizeOnDrop)]
pub struct ExchangeSecretKey {
    secret: StaticSecret,
}

impl ExchangeSecretKey {
    /// Generate a new random secret key.
    pub fn generate() -> Self {
        Self {
            secret: StaticSecret::random_from_rng(OsRng),
        }
    }

    /// The matching public key.
    pub fn public_key(&self) -> ExchangePublicKey {
        ExchangePublicKey::from(PublicKey::from(&self.secret))
    }

    /// Agree on a shared secret with `peer`.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::NonContributory` for low-order peer points.
    pub fn diffie_hellman(&self, peer: &ExchangePublicKey) -> Result<SharedSecret> {
        let shared = self.secret.diffie_hellman(&PublicKey::from(peer));
        if !shared.was_contributory() {
            return Err(CryptoError::NonContributory);
        }
        Ok(SharedSecret {
            bytes: shared.to_bytes(),
        })
    }
}

impl std::fmt::Debug for ExchangeSecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ExchangeSecretKey([REDACTED])")
    }
}

/// Single-use X25519 key pair for one message.
pub struct EphemeralExchange {
    secret: EphemeralSecret,
    public: ExchangePublicKey,
}

impl EphemeralExchange {
    /// Generate a new ephemeral key pair.
    pub fn generate() -> Self {
        let secret = EphemeralSecret::random_from_rng(OsRng);
        let public = ExchangePublicKey::from(PublicKey::from(&secret));
        Self { secret, public }
    }

    /// The ephemeral public key, sent alongside the ciphertext.
    pub fn public_key(&self) -> &ExchangePublicKey {
        &self.public
    }

    /// Consume the ephemeral secret and agree on a shared secret.
    pub fn diffie_hellman(self, peer: &ExchangePublicKey) -> Result<SharedSecret> {
        let shared = self.secret.diffie_hellman(&PublicKey::from(peer));
        if !shared.was_contributory() {
            return Err(CryptoError::NonContributory);
        }
        Ok(SharedSecret {
            bytes: shared.to_bytes(),
        })
    }
}

impl std::fmt::Debug for EphemeralExchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EphemeralExchange {{ public: {:?} }}", self.public)
    }
}

/// Raw Diffie-Hellman output. Use [`SharedSecret::derive_key`], never the bytes.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret {
    bytes: [u8; 32],
}

impl SharedSecret {
    /// Derive a 256-bit key bound to `context` and the `binding` transcript.
    pub fn derive_key(&self, context: &str, binding: &[u8]) -> [u8; 32] {
        let mut material = Vec::with_capacity(32 + binding.len());
        material.extend_from_slice(&self.bytes);
        material.extend_from_slice(binding);
        let key = blake3::derive_key(context, &material);
        material.zeroize();
        key
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SharedSecret([REDACTED])")
    }
}
