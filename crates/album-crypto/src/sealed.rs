//! Public-key sealed boxes.
//!
//! `seal` encrypts to a recipient's long-term X25519 key:
//!
//! 1. fresh ephemeral X25519 key pair
//! 2. ECDH(ephemeral, recipient)
//! 3. BLAKE3 key derivation bound to both public keys
//! 4. XChaCha20-Poly1305 with a fresh random nonce and detached tag
//!
//! `open` performs the mirror-image agreement with the recipient's static
//! secret. Both the per-message key and the per-message nonce are fresh, so
//! no (key, nonce) pair can repeat.

use serde::{Deserialize, Serialize};

use crate::exchange::{EphemeralExchange, ExchangePublicKey, ExchangeSecretKey};
use crate::symmetric::{open_detached, seal_detached, Nonce, SymmetricKey, Tag};
use crate::Result;

/// KDF context for sealed-box message keys.
pub const SEALED_BOX_CONTEXT: &str = "album sealed box message key v1";

/// Ciphertext produced by [`seal`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedBox {
    /// Sender's ephemeral public key.
    pub ephemeral_public: ExchangePublicKey,
    /// AEAD nonce.
    pub nonce: Nonce,
    /// Ciphertext (same length as the plaintext).
    pub ciphertext: Vec<u8>,
    /// Detached authentication tag.
    pub tag: Tag,
}

fn message_key(
    shared: crate::SharedSecret,
    ephemeral_public: &ExchangePublicKey,
    recipient_public: &ExchangePublicKey,
) -> SymmetricKey {
    let mut binding = [0u8; 64];
    binding[..32].copy_from_slice(ephemeral_public.as_bytes());
    binding[32..].copy_from_slice(recipient_public.as_bytes());
    SymmetricKey::from_array(shared.derive_key(SEALED_BOX_CONTEXT, &binding))
}

/// Encrypt `plaintext` so only the holder of `recipient`'s secret can read it.
///
/// # Errors
///
/// Returns `CryptoError::NonContributory` if `recipient` is a low-order point.
pub fn seal(recipient: &ExchangePublicKey, plaintext: &[u8], aad: &[u8]) -> Result<SealedBox> {
    seal_with_ephemeral(EphemeralExchange::generate(), recipient, plaintext, aad)
}

/// Like [`seal`], with a caller-generated ephemeral key.
///
/// Lets the caller bind the ephemeral public key into `aad` before sealing.
/// The ephemeral secret is consumed, so it cannot be reused.
pub fn seal_with_ephemeral(
    ephemeral: EphemeralExchange,
    recipient: &ExchangePublicKey,
    plaintext: &[u8],
    aad: &[u8],
) -> Result<SealedBox> {
    let ephemeral_public = *ephemeral.public_key();
    let shared = ephemeral.diffie_hellman(recipient)?;
    let key = message_key(shared, &ephemeral_public, recipient);

    let detached = seal_detached(&key, plaintext, aad)?;
    Ok(SealedBox {
        ephemeral_public,
        nonce: detached.nonce,
        ciphertext: detached.ciphertext,
        tag: detached.tag,
    })
}

/// Decrypt a [`SealedBox`] with the recipient's static secret.
///
/// # Errors
///
/// Returns `CryptoError::Decryption` if the tag check fails, and
/// `CryptoError::NonContributory` for a malicious ephemeral key.
pub fn open(secret: &ExchangeSecretKey, sealed: &SealedBox, aad: &[u8]) -> Result<Vec<u8>> {
    let shared = secret.diffie_hellman(&sealed.ephemeral_public)?;
    let key = message_key(shared, &sealed.ephemeral_public, &secret.public_key());
    open_detached(&key, &sealed.nonce, &sealed.ciphertext, &sealed.tag, aad)
}
