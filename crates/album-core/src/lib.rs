//! # album-core
//!
//! Secure direct messaging for the Album platform.
//!
//! This is the main entry point for applications embedding the messaging
//! core. [`AlbumService`] exposes login, token revocation, and sending,
//! receiving and opening end-to-end encrypted, signed messages.
//!
//! ## Quick Start
//!
//! ```
//! use album_core::{AlbumService, CoreError};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let service = AlbumService::in_memory()?;
//! service.register_user("alice", b"alice secret").await?;
//! service.register_user("bob", b"bob secret").await?;
//!
//! let alice = service.login("alice", b"alice secret").await?;
//! service.send_message(&alice, "bob", b"hello bob").await?;
//!
//! let bob = service.login("bob", b"bob secret").await?;
//! let inbox = service.receive_messages(&bob).await?;
//! assert_eq!(service.open_message(&bob, &inbox[0]).await?, b"hello bob");
//!
//! service.revoke_token(&bob).await?;
//! assert_eq!(service.receive_messages(&bob).await, Err(CoreError::TokenRevoked));
//! # Ok::<(), CoreError>(())
//! # }).unwrap();
//! ```
//!
//! ## Architecture
//!
//! - **album-crypto**: AEAD, key agreement, signatures, secret hashing
//! - **album-identity**: per-user key pairs; the only holder of private keys
//! - **album-auth**: credential verification and session tokens
//! - **album-protocol**: envelope format and the message codec
//! - **album-store**: envelope persistence

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod service;

pub use config::{ConfigError, CoreConfig, CoreConfigBuilder, MessagingConfig, StorageConfig};
pub use error::{CoreError, Result};
pub use service::AlbumService;

// Re-export commonly used types
pub use album_auth::{
    AccountStatus, AuthConfig, Clock, CredentialParams, LoginRecord, ManualClock, SessionToken,
    SystemClock, MAX_LOGIN_HISTORY,
};
pub use album_identity::{PublicKeys, UserId};
pub use album_protocol::{EnvelopeId, MessageEnvelope};
pub use album_store::{EnvelopeStore, MemoryEnvelopeStore, SledEnvelopeStore};
