//! XChaCha20-Poly1305 authenticated encryption with detached tags.
//!
//! Envelopes carry the ciphertext and the 16-byte authentication tag as
//! separate fields, so this module works in detached mode: the tag is
//! returned next to the ciphertext instead of being appended to it.
//!
//! ## Security Notes
//!
//! - Keys are zeroized on drop
//! - Every call to [`seal_detached`] draws a fresh 192-bit nonce from `OsRng`
//! - NEVER reuse a nonce with the same key

use chacha20poly1305::{
    aead::{AeadInPlace, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{CryptoError, Result};

/// Size of symmetric key in bytes (256 bits).
pub const KEY_SIZE: usize = 32;

/// Size of nonce in bytes (192 bits for XChaCha20).
pub const NONCE_SIZE: usize = 24;

/// Size of the Poly1305 authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// A 256-bit symmetric key. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey {
    bytes: [u8; KEY_SIZE],
}

impl SymmetricKey {
    /// Generate a new random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Wrap derived key material.
    pub fn from_array(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Create a key from a byte slice.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; KEY_SIZE] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyLength {
                expected: KEY_SIZE,
                actual: bytes.len(),
            })?;
        Ok(Self { bytes: arr })
    }

    fn cipher(&self) -> XChaCha20Poly1305 {
        XChaCha20Poly1305::new((&self.bytes).into())
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SymmetricKey([REDACTED])")
    }
}

/// A 192-bit XChaCha20 nonce.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Nonce([u8; NONCE_SIZE]);

impl Nonce {
    /// Generate a new random nonce.
    pub fn generate() -> Self {
        let mut bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create a nonce from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not exactly 24 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; NONCE_SIZE] =
            bytes
                .try_into()
                .map_err(|_| CryptoError::InvalidNonceLength {
                    expected: NONCE_SIZE,
                    actual: bytes.len(),
                })?;
        Ok(Self(arr))
    }

    /// Get the nonce bytes.
    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }

    /// Mutable access to the nonce bytes.
    pub fn as_mut_bytes(&mut self) -> &mut [u8; NONCE_SIZE] {
        &mut self.0
    }
}

impl std::fmt::Debug for Nonce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Nonce({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}

/// A detached Poly1305 authentication tag.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag([u8; TAG_SIZE]);

impl Tag {
    /// Create a tag from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; TAG_SIZE] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidHashLength {
                expected: TAG_SIZE,
                actual: bytes.len(),
            })?;
        Ok(Self(arr))
    }

    /// Get the tag bytes.
    pub fn as_bytes(&self) -> &[u8; TAG_SIZE] {
        &self.0
    }

    /// Mutable access to the tag bytes.
    pub fn as_mut_bytes(&mut self) -> &mut [u8; TAG_SIZE] {
        &mut self.0
    }
}

impl std::fmt::Debug for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Tag({})", hex::encode(&self.0[..4]))
    }
}

/// Output of a detached AEAD encryption.
#[derive(Clone, Debug)]
pub struct Detached {
    /// The nonce used for encryption.
    pub nonce: Nonce,
    /// The ciphertext, same length as the plaintext.
    pub ciphertext: Vec<u8>,
    /// The authentication tag over ciphertext and AAD.
    pub tag: Tag,
}

/// Encrypt `plaintext` under `key` with a fresh random nonce.
///
/// `aad` is authenticated but not encrypted.
pub fn seal_detached(key: &SymmetricKey, plaintext: &[u8], aad: &[u8]) -> Result<Detached> {
    let nonce = Nonce::generate();
    let mut buffer = plaintext.to_vec();

    let tag = key
        .cipher()
        .encrypt_in_place_detached(XNonce::from_slice(nonce.as_bytes()), aad, &mut buffer)
        .map_err(|_| CryptoError::Encryption("XChaCha20-Poly1305 encryption failed".into()))?;

    let mut tag_bytes = [0u8; TAG_SIZE];
    tag_bytes.copy_from_slice(tag.as_slice());

    Ok(Detached {
        nonce,
        ciphertext: buffer,
        tag: Tag(tag_bytes),
    })
}

/// Decrypt a detached ciphertext.
///
/// # Errors
///
/// Returns `CryptoError::Decryption` if the tag does not authenticate the
/// ciphertext and AAD under `key`.
pub fn open_detached(
    key: &SymmetricKey,
    nonce: &Nonce,
    ciphertext: &[u8],
    tag: &Tag,
    aad: &[u8],
) -> Result<Vec<u8>> {
    let mut buffer = ciphertext.to_vec();
    key.cipher()
        .decrypt_in_place_detached(
            XNonce::from_slice(nonce.as_bytes()),
            aad,
            &mut buffer,
            chacha20poly1305::Tag::from_slice(tag.as_bytes()),
        )
        .map_err(|_| CryptoError::Decryption)?;
    Ok(buffer)
}
