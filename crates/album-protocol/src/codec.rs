//! Sealing and opening message envelopes.
//!
//! ## Sending
//!
//! 1. Look up sender and recipient (`UnknownIdentity` before any crypto)
//! 2. Fresh envelope id and ephemeral X25519 key
//! 3. Seal the plaintext to the recipient's key with a fresh nonce; the
//!    associated data is the header plus the ephemeral public key
//! 4. Sign the full transcript with the sender's key (inside the key store)
//!
//! ## Receiving
//!
//! Checks run in a fixed order and stop at the first failure:
//!
//! 1. sender and recipient are known (`UnknownIdentity`)
//! 2. the caller is the recipient (`RecipientMismatch`)
//! 3. the sender signature verifies (`SignatureInvalid`)
//! 4. the ciphertext authenticates and decrypts (`DecryptionFailed`)
//!
//! Steps 1 and 2 do no cryptographic work. Plaintext is only returned after
//! every check has passed.

use std::sync::Arc;

use tracing::{debug, warn};

use album_crypto::{seal_with_ephemeral, EphemeralExchange};
use album_identity::{KeyStore, UserId};

use crate::envelope::{header_aad, signing_transcript, EnvelopeId, MessageEnvelope};
use crate::limits::MAX_PLAINTEXT_SIZE;
use crate::{ProtocolError, Result};

/// Seals and opens envelopes using keys held by a [`KeyStore`].
#[derive(Debug, Clone)]
pub struct MessageCodec {
    keys: Arc<KeyStore>,
    max_plaintext_size: usize,
}

impl MessageCodec {
    /// Create a codec with the default plaintext limit.
    pub fn new(keys: Arc<KeyStore>) -> Self {
        Self::with_max_plaintext_size(keys, MAX_PLAINTEXT_SIZE)
    }

    /// Create a codec with a custom plaintext limit, capped at
    /// [`MAX_PLAINTEXT_SIZE`].
    pub fn with_max_plaintext_size(keys: Arc<KeyStore>, max_plaintext_size: usize) -> Self {
        Self {
            keys,
            max_plaintext_size: max_plaintext_size.min(MAX_PLAINTEXT_SIZE),
        }
    }

    /// Plaintext limit in bytes.
    pub fn max_plaintext_size(&self) -> usize {
        self.max_plaintext_size
    }

    /// Encrypt `plaintext` for `recipient` and sign it as `sender`.
    ///
    /// `sent_at` is the send time in Unix seconds.
    ///
    /// # Errors
    ///
    /// Returns `PayloadTooLarge` or `UnknownIdentity` before doing any
    /// cryptographic work.
    pub fn encrypt_and_sign(
        &self,
        sender: &UserId,
        recipient: &UserId,
        plaintext: &[u8],
        sent_at: u64,
    ) -> Result<MessageEnvelope> {
        if plaintext.len() > self.max_plaintext_size {
            return Err(ProtocolError::PayloadTooLarge {
                max: self.max_plaintext_size,
                actual: plaintext.len(),
            });
        }
        self.keys.lookup_public_keys(sender)?;
        let recipient_keys = self.keys.lookup_public_keys(recipient)?;

        let id = EnvelopeId::generate();
        let ephemeral = EphemeralExchange::generate();
        let ephemeral_public = *ephemeral.public_key();
        let aad = header_aad(&id, sender, recipient, sent_at, &ephemeral_public);
        let sealed = seal_with_ephemeral(ephemeral, &recipient_keys.exchange, plaintext, &aad)?;

        let transcript = signing_transcript(&id, sender, recipient, sent_at, &sealed);
        let signature = self.keys.sign_with_private_key(sender, &transcript)?;

        debug!(
            envelope = %id,
            sender = %sender,
            recipient = %recipient,
            size = plaintext.len(),
            "Sealed envelope"
        );
        Ok(MessageEnvelope {
            id,
            sender: sender.clone(),
            recipient: recipient.clone(),
            sent_at,
            ephemeral_public: sealed.ephemeral_public,
            nonce: sealed.nonce,
            ciphertext: sealed.ciphertext,
            tag: sealed.tag,
            signature,
        })
    }

    /// Verify `envelope` and decrypt it for `caller`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownIdentity`, `RecipientMismatch`, `SignatureInvalid` or
    /// `DecryptionFailed`, checked in that order.
    pub fn verify_and_decrypt(&self, envelope: &MessageEnvelope, caller: &UserId) -> Result<Vec<u8>> {
        let sender_keys = self.keys.lookup_public_keys(&envelope.sender)?;
        self.keys.lookup_public_keys(&envelope.recipient)?;

        if caller != &envelope.recipient {
            warn!(envelope = %envelope.id, caller = %caller, "Envelope opened by non-recipient");
            return Err(ProtocolError::RecipientMismatch);
        }

        if sender_keys
            .signing
            .verify(&envelope.transcript(), &envelope.signature)
            .is_err()
        {
            warn!(envelope = %envelope.id, sender = %envelope.sender, "Envelope signature invalid");
            return Err(ProtocolError::SignatureInvalid);
        }

        let plaintext = self
            .keys
            .decrypt_with_private_key(caller, &envelope.sealed_box(), &envelope.aad())
            .map_err(|err| match ProtocolError::from(err) {
                ProtocolError::Crypto(_) => ProtocolError::DecryptionFailed,
                other => other,
            })?;

        debug!(envelope = %envelope.id, recipient = %caller, "Opened envelope");
        Ok(plaintext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const NOW: u64 = 1_700_000_000;

    struct Fixture {
        codec: MessageCodec,
        keys: Arc<KeyStore>,
        alice: UserId,
        bob: UserId,
        eve: UserId,
    }

    fn fixture() -> Fixture {
        let keys = Arc::new(KeyStore::new());
        let alice = UserId::new("alice").unwrap();
        let bob = UserId::new("bob").unwrap();
        let eve = UserId::new("eve").unwrap();
        for user in [&alice, &bob, &eve] {
            keys.register(user).unwrap();
        }
        Fixture {
            codec: MessageCodec::new(keys.clone()),
            keys,
            alice,
            bob,
            eve,
        }
    }

    fn sealed(f: &Fixture) -> MessageEnvelope {
        f.codec
            .encrypt_and_sign(&f.alice, &f.bob, b"hello bob", NOW)
            .unwrap()
    }

    #[test]
    fn test_roundtrip() {
        let f = fixture();
        let env = sealed(&f);
        assert_eq!(env.sender(), &f.alice);
        assert_eq!(env.recipient(), &f.bob);
        assert_eq!(env.sent_at(), NOW);
        assert_eq!(f.codec.verify_and_decrypt(&env, &f.bob).unwrap(), b"hello bob");
    }

    #[test]
    fn test_ciphertext_is_not_plaintext() {
        let f = fixture();
        let env = sealed(&f);
        assert_ne!(env.ciphertext, b"hello bob");
        assert_eq!(env.ciphertext_len(), b"hello bob".len());
    }

    #[test]
    fn test_empty_plaintext() {
        let f = fixture();
        let env = f.codec.encrypt_and_sign(&f.alice, &f.bob, b"", NOW).unwrap();
        assert!(f.codec.verify_and_decrypt(&env, &f.bob).unwrap().is_empty());
    }

    #[test]
    fn test_message_to_self() {
        let f = fixture();
        let env = f.codec.encrypt_and_sign(&f.alice, &f.alice, b"note", NOW).unwrap();
        assert_eq!(f.codec.verify_and_decrypt(&env, &f.alice).unwrap(), b"note");
    }

    #[test]
    fn test_unknown_sender_or_recipient() {
        let f = fixture();
        let ghost = UserId::new("ghost").unwrap();
        assert_eq!(
            f.codec.encrypt_and_sign(&ghost, &f.bob, b"x", NOW),
            Err(ProtocolError::UnknownIdentity("ghost".into()))
        );
        assert_eq!(
            f.codec.encrypt_and_sign(&f.alice, &ghost, b"x", NOW),
            Err(ProtocolError::UnknownIdentity("ghost".into()))
        );
    }

    #[test]
    fn test_unknown_identity_checked_before_recipient() {
        let f = fixture();
        let env = sealed(&f);
        f.keys.remove(&f.alice).unwrap();
        assert_eq!(
            f.codec.verify_and_decrypt(&env, &f.eve),
            Err(ProtocolError::UnknownIdentity("alice".into()))
        );
    }

    #[test]
    fn test_payload_too_large() {
        let keys = Arc::new(KeyStore::new());
        let codec = MessageCodec::with_max_plaintext_size(keys.clone(), 8);
        let a = UserId::new("a").unwrap();
        keys.register(&a).unwrap();
        assert_eq!(
            codec.encrypt_and_sign(&a, &a, &[0u8; 9], NOW),
            Err(ProtocolError::PayloadTooLarge { max: 8, actual: 9 })
        );
        assert!(codec.encrypt_and_sign(&a, &a, &[0u8; 8], NOW).is_ok());
    }

    #[test]
    fn test_custom_limit_is_capped() {
        let codec = MessageCodec::with_max_plaintext_size(Arc::new(KeyStore::new()), usize::MAX);
        assert_eq!(codec.max_plaintext_size(), MAX_PLAINTEXT_SIZE);
    }

    #[test]
    fn test_recipient_mismatch() {
        let f = fixture();
        let env = sealed(&f);
        assert_eq!(
            f.codec.verify_and_decrypt(&env, &f.eve),
            Err(ProtocolError::RecipientMismatch)
        );
        assert_eq!(
            f.codec.verify_and_decrypt(&env, &f.alice),
            Err(ProtocolError::RecipientMismatch)
        );
    }

    #[test]
    fn test_tampered_ciphertext() {
        let f = fixture();
        let mut env = sealed(&f);
        env.ciphertext[0] ^= 0x01;
        assert_eq!(
            f.codec.verify_and_decrypt(&env, &f.bob),
            Err(ProtocolError::SignatureInvalid)
        );
    }

    #[test]
    fn test_tampered_tag_nonce_and_ephemeral() {
        let f = fixture();

        let mut env = sealed(&f);
        env.tag.as_mut_bytes()[0] ^= 0x01;
        assert_eq!(f.codec.verify_and_decrypt(&env, &f.bob), Err(ProtocolError::SignatureInvalid));

        let mut env = sealed(&f);
        env.nonce.as_mut_bytes()[0] ^= 0x01;
        assert_eq!(f.codec.verify_and_decrypt(&env, &f.bob), Err(ProtocolError::SignatureInvalid));

        let mut env = sealed(&f);
        env.ephemeral_public.as_mut_bytes()[0] ^= 0x01;
        assert_eq!(f.codec.verify_and_decrypt(&env, &f.bob), Err(ProtocolError::SignatureInvalid));
    }

    #[test]
    fn test_tampered_header_fields() {
        let f = fixture();

        let mut env = sealed(&f);
        env.sent_at += 1;
        assert_eq!(f.codec.verify_and_decrypt(&env, &f.bob), Err(ProtocolError::SignatureInvalid));

        let mut env = sealed(&f);
        env.id = EnvelopeId::generate();
        assert_eq!(f.codec.verify_and_decrypt(&env, &f.bob), Err(ProtocolError::SignatureInvalid));

        // Re-attributing to another known sender fails their key check.
        let mut env = sealed(&f);
        env.sender = f.eve.clone();
        assert_eq!(f.codec.verify_and_decrypt(&env, &f.bob), Err(ProtocolError::SignatureInvalid));
    }

    #[test]
    fn test_tampered_signature() {
        let f = fixture();
        let mut env = sealed(&f);
        env.signature.as_mut_bytes()[10] ^= 0x01;
        assert_eq!(
            f.codec.verify_and_decrypt(&env, &f.bob),
            Err(ProtocolError::SignatureInvalid)
        );
    }

    #[test]
    fn test_resigned_forgery_fails_decryption() {
        // A sender who re-signs an edited envelope passes the signature check
        // but not the AEAD.
        let f = fixture();
        let mut env = sealed(&f);
        env.ciphertext[0] ^= 0x01;
        env.signature = f
            .keys
            .sign_with_private_key(&f.alice, &env.transcript())
            .unwrap();
        assert_eq!(
            f.codec.verify_and_decrypt(&env, &f.bob),
            Err(ProtocolError::DecryptionFailed)
        );

        let mut env = sealed(&f);
        env.sent_at += 5;
        env.signature = f
            .keys
            .sign_with_private_key(&f.alice, &env.transcript())
            .unwrap();
        assert_eq!(
            f.codec.verify_and_decrypt(&env, &f.bob),
            Err(ProtocolError::DecryptionFailed)
        );
    }

    #[test]
    fn test_rekeyed_recipient_cannot_open_old_envelope() {
        let f = fixture();
        let env = sealed(&f);
        f.keys.rekey(&f.bob).unwrap();
        assert_eq!(
            f.codec.verify_and_decrypt(&env, &f.bob),
            Err(ProtocolError::DecryptionFailed)
        );
    }

    #[test]
    fn test_nonce_and_ephemeral_uniqueness() {
        let f = fixture();
        let mut nonces = HashSet::new();
        let mut ephemerals = HashSet::new();
        let mut ids = HashSet::new();
        for _ in 0..10_000 {
            let env = f.codec.encrypt_and_sign(&f.alice, &f.bob, b"same", NOW).unwrap();
            assert!(nonces.insert(env.nonce));
            assert!(ephemerals.insert(env.ephemeral_public));
            assert!(ids.insert(env.id));
        }
    }

    #[test]
    fn test_bytes_roundtrip_still_opens() {
        let f = fixture();
        let env = sealed(&f);
        let decoded = MessageEnvelope::from_bytes(&env.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, env);
        assert_eq!(f.codec.verify_and_decrypt(&decoded, &f.bob).unwrap(), b"hello bob");
    }
}
