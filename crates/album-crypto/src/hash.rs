//! BLAKE3 hashing primitives.
//!
//! Provides a 256-bit hash type used for fingerprints, keyed MACs and
//! storage keys.

use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::{CryptoError, Result};

/// A 256-bit (32-byte) BLAKE3 hash value.
#[derive(Clone, Copy, Default, Serialize, Deserialize)]
pub struct Hash256([u8; 32]);

impl Hash256 {
    /// Hash size in bytes.
    pub const SIZE: usize = 32;

    /// Create a hash from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidHashLength {
                expected: Self::SIZE,
                actual: bytes.len(),
            })?;
        Ok(Self(arr))
    }

    /// Get the hash as a byte array reference.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hash a single input.
    pub fn hash(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Hash multiple inputs.
    ///
    /// Each input is length-prefixed so `["ab", "c"]` and `["a", "bc"]` differ.
    pub fn hash_many(inputs: &[&[u8]]) -> Self {
        let mut hasher = blake3::Hasher::new();
        for input in inputs {
            hasher.update(&(input.len() as u64).to_le_bytes());
            hasher.update(input);
        }
        Self(*hasher.finalize().as_bytes())
    }

    /// Keyed hash (MAC) over a single input.
    pub fn keyed_hash(key: &[u8; 32], data: &[u8]) -> Self {
        Self(*blake3::keyed_hash(key, data).as_bytes())
    }

    /// Format as lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| CryptoError::InvalidHexFormat(e.to_string()))?;
        Self::from_bytes(&bytes)
    }
}

impl ConstantTimeEq for Hash256 {
    fn ct_eq(&self, other: &Self) -> subtle::Choice {
        self.0.ct_eq(&other.0)
    }
}

impl PartialEq for Hash256 {
    fn eq(&self, other: &Self) -> bool {
        self.ct_eq(other).into()
    }
}

impl Eq for Hash256 {}

impl std::hash::Hash for Hash256 {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        // Bucket selection only.
        self.0.hash(state);
    }
}

impl std::fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Hash256({})", &self.to_hex()[..16])
    }
}

impl std::fmt::Display for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl AsRef<[u8]> for Hash256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
