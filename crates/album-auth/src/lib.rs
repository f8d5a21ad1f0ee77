//! # album-auth
//!
//! Login and session handling for the Album messaging core.
//!
//! - [`CredentialStore`] checks login secrets against Argon2id verifiers
//! - [`TokenIssuer`] mints session tokens, only from a verified login
//! - [`TokenValidator`] checks and revokes tokens on every request
//! - [`TokenRegistry`] is the per-user-locked record both of them share
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use album_auth::{
//!     AuthConfig, CredentialParams, CredentialStore, ManualClock, TokenIssuer, TokenKey,
//!     TokenRegistry, TokenValidator, Verification,
//! };
//! use album_identity::UserId;
//!
//! let config = AuthConfig::default().with_credential_params(CredentialParams::testing());
//! let credentials = CredentialStore::new(config.credential).unwrap();
//! let alice = UserId::new("alice").unwrap();
//! credentials.enroll(&alice, b"correct horse").unwrap();
//!
//! let key = Arc::new(TokenKey::generate());
//! let registry = Arc::new(TokenRegistry::new());
//! let clock = Arc::new(ManualClock::new(1_700_000_000));
//! let issuer = TokenIssuer::new(key.clone(), registry.clone(), clock.clone(), &config);
//! let validator = TokenValidator::new(key, registry, clock, &config);
//!
//! let Verification::Verified(login) = credentials.verify("alice", b"correct horse").unwrap() else {
//!     panic!("login failed");
//! };
//! let token = issuer.issue(&login).unwrap();
//! assert_eq!(validator.validate(&token).unwrap(), alice);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod clock;
pub mod config;
pub mod credential;
pub mod error;
pub mod issuer;
pub mod registry;
pub mod token;
pub mod validator;

#[cfg(test)]
mod proptests;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::AuthConfig;
pub use credential::{
    AccountStatus, CredentialParams, CredentialStore, LoginRecord, Verification, VerifiedLogin,
    MAX_LOGIN_HISTORY, MAX_SECRET_LEN,
};
pub use error::{AuthError, Result};
pub use issuer::TokenIssuer;
pub use registry::TokenRegistry;
pub use token::{SessionToken, TokenKey, MAX_BEARER_LEN, TOKEN_NONCE_SIZE};
pub use validator::TokenValidator;
