//! Ed25519 signatures.
//!
//! Every envelope is signed by its sender's long-term signing key. Signing
//! keys live inside the identity key store; only [`VerifyingKey`] values are
//! handed to other components.

use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use crate::{CryptoError, Result};

/// Size of an Ed25519 public key in bytes.
pub const VERIFYING_KEY_SIZE: usize = 32;

/// Size of an Ed25519 signature in bytes.
pub const SIGNATURE_SIZE: usize = 64;

/// Ed25519 verifying (public) key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VerifyingKey([u8; VERIFYING_KEY_SIZE]);

impl VerifyingKey {
    /// Create from raw bytes, checking that they encode a curve point.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; VERIFYING_KEY_SIZE] =
            bytes
                .try_into()
                .map_err(|_| CryptoError::InvalidKeyLength {
                    expected: VERIFYING_KEY_SIZE,
                    actual: bytes.len(),
                })?;
        ed25519_dalek::VerifyingKey::from_bytes(&arr)
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
        Ok(Self(arr))
    }

    /// Get the key bytes.
    pub fn as_bytes(&self) -> &[u8; VERIFYING_KEY_SIZE] {
        &self.0
    }

    /// Verify `signature` over `message`.
    ///
    /// Uses strict verification (rejects small-order keys and malleable
    /// signatures).
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::SignatureVerification` on any mismatch.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<()> {
        let key = ed25519_dalek::VerifyingKey::from_bytes(&self.0)
            .map_err(|_| CryptoError::SignatureVerification)?;
        let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
        key.verify_strict(message, &sig)
            .map_err(|_| CryptoError::SignatureVerification)
    }
}

impl std::fmt::Debug for VerifyingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VerifyingKey({}..)", hex::encode(&self.0[..4]))
    }
}

/// Ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature([u8; SIGNATURE_SIZE]);

impl Signature {
    /// Create from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; SIGNATURE_SIZE] =
            bytes
                .try_into()
                .map_err(|_| CryptoError::InvalidKeyLength {
                    expected: SIGNATURE_SIZE,
                    actual: bytes.len(),
                })?;
        Ok(Self(arr))
    }

    /// Get the signature bytes.
    pub fn as_bytes(&self) -> &[u8; SIGNATURE_SIZE] {
        &self.0
    }

    /// Mutable access to the signature bytes.
    pub fn as_mut_bytes(&mut self) -> &mut [u8; SIGNATURE_SIZE] {
        &mut self.0
    }
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Signature({}..)", hex::encode(&self.0[..4]))
    }
}

// serde only derives arrays up to 32 elements.
impl Serialize for Signature {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.0)
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let bytes: Vec<u8> = serde::de::Deserialize::deserialize(deserializer)?;
        Signature::from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}

/// Ed25519 signing key pair. The secret half is zeroized on drop.
pub struct SigningKeyPair {
    signing: SigningKey,
}

impl SigningKeyPair {
    /// Generate a new key pair.
    pub fn generate() -> Self {
        Self {
            signing: SigningKey::generate(&mut OsRng),
        }
    }

    /// The public half.
    pub fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey(self.signing.verifying_key().to_bytes())
    }

    /// Sign `message`.
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.signing.sign(message).to_bytes())
    }
}

impl std::fmt::Debug for SigningKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKeyPair")
            .field("public", &self.verifying_key())
            .field("secret", &"[REDACTED]")
            .finish()
    }
}
