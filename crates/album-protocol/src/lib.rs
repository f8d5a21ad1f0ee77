//! # album-protocol
//!
//! Direct message envelopes for the Album messaging core.
//!
//! An envelope is encrypted to the recipient's long-term X25519 key through a
//! fresh ephemeral key and nonce, and signed by the sender's Ed25519 key over
//! every header and ciphertext field. [`MessageCodec`] is the only way to
//! produce or open one.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
pub mod domain_separation;
pub mod envelope;
pub mod error;
pub mod limits;

#[cfg(test)]
mod proptests;

pub use codec::MessageCodec;
pub use envelope::{EnvelopeId, MessageEnvelope, ENVELOPE_ID_SIZE};
pub use error::{ProtocolError, Result};
pub use limits::{MAX_ENVELOPE_SIZE, MAX_PLAINTEXT_SIZE};
