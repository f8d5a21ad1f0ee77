//! Property-based tests for the envelope codec.

use std::sync::Arc;

use proptest::prelude::*;

use album_identity::{KeyStore, UserId};

use crate::{MessageCodec, MessageEnvelope, ProtocolError};

fn codec_with_users() -> (MessageCodec, UserId, UserId) {
    let keys = Arc::new(KeyStore::new());
    let alice = UserId::new("alice").unwrap();
    let bob = UserId::new("bob").unwrap();
    keys.register(&alice).unwrap();
    keys.register(&bob).unwrap();
    (MessageCodec::new(keys), alice, bob)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// The recipient always recovers the exact plaintext.
    #[test]
    fn seal_open_roundtrip(plaintext in prop::collection::vec(any::<u8>(), 0..4096), sent_at: u64) {
        let (codec, alice, bob) = codec_with_users();
        let env = codec.encrypt_and_sign(&alice, &bob, &plaintext, sent_at).unwrap();
        prop_assert_eq!(codec.verify_and_decrypt(&env, &bob).unwrap(), plaintext);
    }

    /// Flipping any bit of the encoded envelope makes it fail to decode or
    /// fail to open.
    #[test]
    fn encoded_bit_flip_detected(
        plaintext in prop::collection::vec(any::<u8>(), 1..256),
        index: prop::sample::Index,
        bit in 0u8..8,
    ) {
        let (codec, alice, bob) = codec_with_users();
        let env = codec.encrypt_and_sign(&alice, &bob, &plaintext, 0).unwrap();
        let mut bytes = env.to_bytes().unwrap();
        let i = index.index(bytes.len());
        bytes[i] ^= 1 << bit;

        if let Ok(tampered) = MessageEnvelope::from_bytes(&bytes) {
            prop_assert!(codec.verify_and_decrypt(&tampered, &bob).is_err());
        }
    }

    /// Nobody but the recipient can open an envelope.
    #[test]
    fn only_recipient_opens(plaintext in prop::collection::vec(any::<u8>(), 0..128)) {
        let (codec, alice, bob) = codec_with_users();
        let env = codec.encrypt_and_sign(&alice, &bob, &plaintext, 0).unwrap();
        prop_assert_eq!(codec.verify_and_decrypt(&env, &alice), Err(ProtocolError::RecipientMismatch));
    }

    /// Decoding arbitrary bytes never panics.
    #[test]
    fn from_bytes_total(bytes in prop::collection::vec(any::<u8>(), 0..1024)) {
        let _ = MessageEnvelope::from_bytes(&bytes);
    }
}
