//! # album-crypto
//!
//! Cryptographic primitives for the Album messaging core.
//!
//! - **XChaCha20-Poly1305** for authenticated encryption with detached tags
//! - **X25519** for static and ephemeral key agreement
//! - **Ed25519** for sender signatures
//! - **BLAKE3** for hashing, keyed MACs and key derivation
//! - **Argon2id** for secret (password) hashing
//!
//! ## Security
//!
//! All secret data uses `zeroize` for memory cleanup and every comparison of
//! secret values goes through `subtle`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod exchange;
pub mod hash;
pub mod sealed;
pub mod secret_hash;
pub mod signing;
pub mod symmetric;

#[cfg(test)]
mod proptests;

pub use error::{CryptoError, Result};
pub use exchange::{EphemeralExchange, ExchangePublicKey, ExchangeSecretKey, SharedSecret};
pub use hash::Hash256;
pub use sealed::{open, seal, seal_with_ephemeral, SealedBox};
pub use secret_hash::{SecretHashParams, SecretVerifier, SALT_SIZE, VERIFIER_SIZE};
pub use signing::{Signature, SigningKeyPair, VerifyingKey, SIGNATURE_SIZE};
pub use symmetric::{
    open_detached, seal_detached, Detached, Nonce, SymmetricKey, Tag, KEY_SIZE, NONCE_SIZE,
    TAG_SIZE,
};
