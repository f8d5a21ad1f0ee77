//! # album-identity
//!
//! Identity & key store for the Album messaging core.
//!
//! Provides:
//! - [`UserId`]: validated opaque user identifiers
//! - [`UserKeyPair`]: a user's long-term X25519 + Ed25519 key material
//! - [`KeyStore`]: the public key directory and the only place private
//!   key operations run

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod keypair;
pub mod keystore;
pub mod user_id;

#[cfg(test)]
mod proptests;

pub use error::{IdentityError, Result};
pub use keypair::{PublicKeys, UserKeyPair};
pub use keystore::KeyStore;
pub use user_id::{UserId, MAX_USER_ID_LEN};
