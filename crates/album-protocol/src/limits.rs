//! Protocol limits and constants.

/// Maximum plaintext size per message (1 MiB).
pub const MAX_PLAINTEXT_SIZE: usize = 1024 * 1024;

/// Allowance for envelope header fields on top of the ciphertext.
///
/// Covers two user ids, keys, nonce, tag, signature and encoding overhead.
pub const ENVELOPE_OVERHEAD: usize = 1024;

/// Maximum encoded envelope size accepted by [`crate::MessageEnvelope::from_bytes`].
pub const MAX_ENVELOPE_SIZE: usize = MAX_PLAINTEXT_SIZE + ENVELOPE_OVERHEAD;
