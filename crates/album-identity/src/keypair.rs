//! Long-term user key material.
//!
//! Each user owns two key pairs:
//! - X25519 for receiving encrypted envelopes
//! - Ed25519 for signing outgoing envelopes
//!
//! ## Security Notes
//!
//! - Secret keys are zeroized on drop and never serialized
//! - `UserKeyPair` is neither `Clone` nor `Serialize`
//! - Only [`PublicKeys`] leave the key store

use serde::{Deserialize, Serialize};

use album_crypto::{
    open, ExchangePublicKey, ExchangeSecretKey, Hash256, SealedBox, Signature, SigningKeyPair,
    VerifyingKey,
};

use crate::Result;

/// Domain separator for public key fingerprints.
const FINGERPRINT_DOMAIN: &[u8] = b"album-public-keys-fingerprint-v1";

/// Public half of a user's key material.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeys {
    /// X25519 key that envelopes are sealed to.
    pub exchange: ExchangePublicKey,
    /// Ed25519 key that envelope signatures are checked against.
    pub signing: VerifyingKey,
}

impl PublicKeys {
    /// Stable fingerprint of both keys, for out-of-band comparison and logs.
    pub fn fingerprint(&self) -> Hash256 {
        Hash256::hash_many(&[
            FINGERPRINT_DOMAIN,
            self.exchange.as_bytes(),
            self.signing.as_bytes(),
        ])
    }
}

/// A user's private key material.
pub struct UserKeyPair {
    exchange: ExchangeSecretKey,
    signing: SigningKeyPair,
    public: PublicKeys,
}

impl UserKeyPair {
    /// Generate fresh key pairs.
    pub fn generate() -> Self {
        let exchange = ExchangeSecretKey::generate();
        let signing = SigningKeyPair::generate();
        let public = PublicKeys {
            exchange: exchange.public_key(),
            signing: signing.verifying_key(),
        };
        Self {
            exchange,
            signing,
            public,
        }
    }

    /// Public keys.
    pub fn public_keys(&self) -> &PublicKeys {
        &self.public
    }

    /// Sign `data` with the Ed25519 key.
    pub fn sign(&self, data: &[u8]) -> Signature {
        self.signing.sign(data)
    }

    /// Open a sealed box addressed to the X25519 key.
    pub fn open(&self, sealed: &SealedBox, aad: &[u8]) -> Result<Vec<u8>> {
        Ok(open(&self.exchange, sealed, aad)?)
    }
}

impl std::fmt::Debug for UserKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserKeyPair")
            .field("fingerprint", &self.public.fingerprint())
            .field("secrets", &"[REDACTED]")
            .finish()
    }
}
