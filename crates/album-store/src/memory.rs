//! In-memory envelope store.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::debug;

use album_identity::UserId;
use album_protocol::{EnvelopeId, MessageEnvelope, ENVELOPE_ID_SIZE};

use crate::{EnvelopeStore, Result, StoreError};

type Key = (UserId, u64, EnvelopeId);

/// Envelope store backed by a `BTreeMap`. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryEnvelopeStore {
    envelopes: RwLock<BTreeMap<Key, MessageEnvelope>>,
}

impl MemoryEnvelopeStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn recipient_range<'a>(
        map: &'a BTreeMap<Key, MessageEnvelope>,
        recipient: &'a UserId,
    ) -> impl Iterator<Item = (&'a Key, &'a MessageEnvelope)> + 'a {
        let start = (recipient.clone(), 0, EnvelopeId::from_bytes([0; ENVELOPE_ID_SIZE]));
        map.range(start..)
            .take_while(move |((r, _, _), _)| r == recipient)
    }

    fn find_key(
        map: &BTreeMap<Key, MessageEnvelope>,
        recipient: &UserId,
        id: &EnvelopeId,
    ) -> Option<Key> {
        Self::recipient_range(map, recipient)
            .find(|((_, _, i), _)| i == id)
            .map(|(k, _)| k.clone())
    }
}

#[async_trait]
impl EnvelopeStore for MemoryEnvelopeStore {
    async fn put(&self, envelope: &MessageEnvelope) -> Result<()> {
        let mut map = self.envelopes.write().map_err(|_| StoreError::Poisoned)?;
        if Self::find_key(&map, envelope.recipient(), envelope.id()).is_some() {
            return Err(StoreError::Duplicate(envelope.id().to_hex()));
        }
        let key = (envelope.recipient().clone(), envelope.sent_at(), *envelope.id());
        map.insert(key, envelope.clone());
        debug!(envelope = %envelope.id(), recipient = %envelope.recipient(), "Stored envelope");
        Ok(())
    }

    async fn list_for_recipient(&self, recipient: &UserId) -> Result<Vec<MessageEnvelope>> {
        let map = self.envelopes.read().map_err(|_| StoreError::Poisoned)?;
        Ok(Self::recipient_range(&map, recipient)
            .map(|(_, env)| env.clone())
            .collect())
    }

    async fn get(&self, recipient: &UserId, id: &EnvelopeId) -> Result<Option<MessageEnvelope>> {
        let map = self.envelopes.read().map_err(|_| StoreError::Poisoned)?;
        Ok(Self::find_key(&map, recipient, id).and_then(|key| map.get(&key).cloned()))
    }

    async fn delete(&self, recipient: &UserId, id: &EnvelopeId) -> Result<bool> {
        let mut map = self.envelopes.write().map_err(|_| StoreError::Poisoned)?;
        match Self::find_key(&map, recipient, id) {
            Some(key) => {
                map.remove(&key);
                debug!(envelope = %id, recipient = %recipient, "Deleted envelope");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.envelopes.read().map_err(|_| StoreError::Poisoned)?.len())
    }

    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}
