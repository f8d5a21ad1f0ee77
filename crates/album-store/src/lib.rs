//! # album-store
//!
//! Persistence boundary for message envelopes.
//!
//! Envelopes are stored exactly as produced by the codec: still encrypted and
//! signed. The store never sees plaintext and never performs key operations.
//! Records are keyed by (recipient, sent_at, envelope id), so listing a
//! recipient's envelopes returns them in send order.
//!
//! ## Implementations
//!
//! - [`MemoryEnvelopeStore`]: in-process map for tests and ephemeral nodes
//! - [`SledEnvelopeStore`]: durable storage in a sled tree

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod memory;
pub mod sled_store;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryEnvelopeStore;
pub use sled_store::SledEnvelopeStore;
pub use traits::EnvelopeStore;
