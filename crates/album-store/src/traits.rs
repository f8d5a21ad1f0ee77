//! The envelope store boundary.

use async_trait::async_trait;

use album_identity::UserId;
use album_protocol::{EnvelopeId, MessageEnvelope};

use crate::Result;

/// Storage for sealed envelopes, keyed by (recipient, sent_at, id).
///
/// Implementations must:
/// - make `put` atomic: a failed or interrupted put stores nothing
/// - return a recipient's envelopes ordered by `sent_at`, then id
/// - treat stored bytes as untrusted and never panic on corrupt records
#[async_trait]
pub trait EnvelopeStore: Send + Sync {
    /// Store an envelope under its recipient.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Duplicate` if the recipient already has an
    /// envelope with the same id.
    async fn put(&self, envelope: &MessageEnvelope) -> Result<()>;

    /// All envelopes addressed to `recipient`, oldest first.
    async fn list_for_recipient(&self, recipient: &UserId) -> Result<Vec<MessageEnvelope>>;

    /// One envelope addressed to `recipient`.
    async fn get(&self, recipient: &UserId, id: &EnvelopeId) -> Result<Option<MessageEnvelope>>;

    /// Delete one envelope addressed to `recipient`. Returns whether it existed.
    async fn delete(&self, recipient: &UserId, id: &EnvelopeId) -> Result<bool>;

    /// Total number of stored envelopes.
    async fn count(&self) -> Result<usize>;

    /// Flush pending writes to durable storage. No-op for in-memory stores.
    async fn flush(&self) -> Result<()>;
}
