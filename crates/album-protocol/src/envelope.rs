//! The direct message envelope.
//!
//! ## Envelope Structure
//!
//! ```text
//! +------------------+
//! | id               | 16 bytes - random, unique per envelope
//! | sender           | user id
//! | recipient        | user id
//! | sent_at          | Unix seconds
//! +------------------+  <- AEAD associated data (with ephemeral_public)
//! | ephemeral_public | 32 bytes - single-use X25519 key
//! | nonce            | 24 bytes - XChaCha20 nonce
//! | ciphertext       | variable
//! | tag              | 16 bytes - Poly1305
//! +------------------+  <- signed by the sender
//! | signature        | 64 bytes - Ed25519
//! +------------------+
//! ```
//!
//! The AEAD associated data binds the routing header to the ciphertext, and
//! the signature binds the sender to everything above it. Editing any field
//! makes either the signature or the decryption fail.

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use album_crypto::{ExchangePublicKey, Nonce, SealedBox, Signature, Tag};
use album_identity::UserId;

use crate::domain_separation::{build_domain_label, purposes};
use crate::limits::MAX_ENVELOPE_SIZE;
use crate::{ProtocolError, Result};

/// Size of an envelope id in bytes.
pub const ENVELOPE_ID_SIZE: usize = 16;

/// Random envelope identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnvelopeId([u8; ENVELOPE_ID_SIZE]);

impl EnvelopeId {
    /// Generate a random id.
    pub fn generate() -> Self {
        let mut bytes = [0u8; ENVELOPE_ID_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub fn from_bytes(bytes: [u8; ENVELOPE_ID_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the id bytes.
    pub fn as_bytes(&self) -> &[u8; ENVELOPE_ID_SIZE] {
        &self.0
    }

    /// Hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
        let arr: [u8; ENVELOPE_ID_SIZE] = bytes.as_slice().try_into().map_err(|_| {
            ProtocolError::Malformed(format!(
                "envelope id must be {} bytes, got {}",
                ENVELOPE_ID_SIZE,
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }
}

impl std::fmt::Debug for EnvelopeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EnvelopeId({})", self.to_hex())
    }
}

impl std::fmt::Display for EnvelopeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// An encrypted, signed direct message.
///
/// Envelopes are immutable once produced by the codec.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEnvelope {
    pub(crate) id: EnvelopeId,
    pub(crate) sender: UserId,
    pub(crate) recipient: UserId,
    pub(crate) sent_at: u64,
    pub(crate) ephemeral_public: ExchangePublicKey,
    pub(crate) nonce: Nonce,
    pub(crate) ciphertext: Vec<u8>,
    pub(crate) tag: Tag,
    pub(crate) signature: Signature,
}

fn push_user(out: &mut Vec<u8>, user: &UserId) {
    let bytes = user.as_str().as_bytes();
    out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    out.extend_from_slice(bytes);
}

/// Associated data for the AEAD: the routing header plus the ephemeral key.
pub(crate) fn header_aad(
    id: &EnvelopeId,
    sender: &UserId,
    recipient: &UserId,
    sent_at: u64,
    ephemeral_public: &ExchangePublicKey,
) -> Vec<u8> {
    let mut context = Vec::with_capacity(ENVELOPE_ID_SIZE + 8 + 8 + 32 + 64);
    context.extend_from_slice(id.as_bytes());
    push_user(&mut context, sender);
    push_user(&mut context, recipient);
    context.extend_from_slice(&sent_at.to_be_bytes());
    context.extend_from_slice(ephemeral_public.as_bytes());
    build_domain_label(purposes::ENVELOPE_AAD, &context)
}

/// Bytes covered by the sender signature.
pub(crate) fn signing_transcript(
    id: &EnvelopeId,
    sender: &UserId,
    recipient: &UserId,
    sent_at: u64,
    sealed: &SealedBox,
) -> Vec<u8> {
    let mut context = Vec::with_capacity(128 + sealed.ciphertext.len());
    push_user(&mut context, sender);
    push_user(&mut context, recipient);
    context.extend_from_slice(&sent_at.to_be_bytes());
    context.extend_from_slice(id.as_bytes());
    context.extend_from_slice(sealed.ephemeral_public.as_bytes());
    context.extend_from_slice(sealed.nonce.as_bytes());
    context.extend_from_slice(&(sealed.ciphertext.len() as u64).to_be_bytes());
    context.extend_from_slice(&sealed.ciphertext);
    context.extend_from_slice(sealed.tag.as_bytes());
    build_domain_label(purposes::ENVELOPE_SIG, &context)
}

impl MessageEnvelope {
    /// Envelope id.
    pub fn id(&self) -> &EnvelopeId {
        &self.id
    }

    /// Sending user.
    pub fn sender(&self) -> &UserId {
        &self.sender
    }

    /// Receiving user.
    pub fn recipient(&self) -> &UserId {
        &self.recipient
    }

    /// Send time (Unix seconds).
    pub fn sent_at(&self) -> u64 {
        self.sent_at
    }

    /// Ciphertext length, equal to the plaintext length.
    pub fn ciphertext_len(&self) -> usize {
        self.ciphertext.len()
    }

    pub(crate) fn sealed_box(&self) -> SealedBox {
        SealedBox {
            ephemeral_public: self.ephemeral_public,
            nonce: self.nonce,
            ciphertext: self.ciphertext.clone(),
            tag: self.tag,
        }
    }

    pub(crate) fn aad(&self) -> Vec<u8> {
        header_aad(
            &self.id,
            &self.sender,
            &self.recipient,
            self.sent_at,
            &self.ephemeral_public,
        )
    }

    pub(crate) fn transcript(&self) -> Vec<u8> {
        signing_transcript(
            &self.id,
            &self.sender,
            &self.recipient,
            self.sent_at,
            &self.sealed_box(),
        )
    }

    /// Encode for storage or transport.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| ProtocolError::Malformed(e.to_string()))
    }

    /// Decode an envelope. Only structure is checked here; authenticity is
    /// checked by [`crate::MessageCodec::verify_and_decrypt`].
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::Malformed` for oversize or undecodable input.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() > MAX_ENVELOPE_SIZE {
            return Err(ProtocolError::Malformed(format!(
                "envelope too large: max {} bytes, got {}",
                MAX_ENVELOPE_SIZE,
                bytes.len()
            )));
        }
        bincode::deserialize(bytes).map_err(|e| ProtocolError::Malformed(e.to_string()))
    }
}
