//! Property-based tests for cryptographic primitives.

use proptest::prelude::*;

use crate::{
    open, open_detached, seal, seal_detached, CryptoError, ExchangeSecretKey, Hash256,
    SigningKeyPair, SymmetricKey,
};

proptest! {
    /// Detached encryption followed by decryption returns the plaintext.
    #[test]
    fn detached_roundtrip(plaintext: Vec<u8>, aad in prop::collection::vec(any::<u8>(), 0..64)) {
        let key = SymmetricKey::generate();
        let sealed = seal_detached(&key, &plaintext, &aad).unwrap();
        let opened = open_detached(&key, &sealed.nonce, &sealed.ciphertext, &sealed.tag, &aad).unwrap();
        prop_assert_eq!(plaintext, opened);
    }

    /// Flipping any ciphertext bit is detected.
    #[test]
    fn detached_bit_flip_detected(
        plaintext in prop::collection::vec(any::<u8>(), 1..256),
        index: prop::sample::Index,
        bit in 0u8..8,
    ) {
        let key = SymmetricKey::generate();
        let mut sealed = seal_detached(&key, &plaintext, b"").unwrap();
        let i = index.index(sealed.ciphertext.len());
        sealed.ciphertext[i] ^= 1 << bit;
        let result = open_detached(&key, &sealed.nonce, &sealed.ciphertext, &sealed.tag, b"");
        prop_assert_eq!(result, Err(CryptoError::Decryption));
    }

    /// Sealed boxes open only for their recipient.
    #[test]
    fn sealed_box_roundtrip(plaintext: Vec<u8>) {
        let recipient = ExchangeSecretKey::generate();
        let sealed = seal(&recipient.public_key(), &plaintext, b"aad").unwrap();
        prop_assert_eq!(open(&recipient, &sealed, b"aad").unwrap(), plaintext);
    }

    /// Signatures verify for the signed message only.
    #[test]
    fn signature_binds_message(message: Vec<u8>, other: Vec<u8>) {
        let pair = SigningKeyPair::generate();
        let sig = pair.sign(&message);
        prop_assert!(pair.verifying_key().verify(&message, &sig).is_ok());
        if message != other {
            prop_assert!(pair.verifying_key().verify(&other, &sig).is_err());
        }
    }

    /// Hashing is deterministic and hex-roundtrips.
    #[test]
    fn hash_hex_roundtrip(data: Vec<u8>) {
        let h = Hash256::hash(&data);
        prop_assert_eq!(Hash256::from_hex(&h.to_hex()).unwrap(), h);
    }
}
