//! Sled-backed envelope store.
//!
//! Envelopes live in one sled tree, with a second tree indexing them by id:
//!
//! ```text
//! envelopes: BLAKE3(recipient) (32) || sent_at BE (8) || envelope id (16) -> encoded envelope
//! index:     BLAKE3(recipient) (32) || envelope id (16)                   -> envelopes key
//! ```
//!
//! The big-endian timestamp makes a prefix scan over a recipient return
//! envelopes in send order; the index answers `get` and `delete` without a
//! scan. Puts and deletes touch both trees in one transaction, so a failed
//! put leaves nothing behind and the duplicate check cannot race.
//!
//! Stored records are size-checked before decoding and re-checked against the
//! requested recipient; corrupt records surface as `StoreError::Corrupted`.

use std::path::Path;

use async_trait::async_trait;
use sled::transaction::{
    ConflictableTransactionError, ConflictableTransactionResult, TransactionError, Transactional,
};
use tracing::{debug, info};

use album_crypto::Hash256;
use album_identity::UserId;
use album_protocol::{EnvelopeId, MessageEnvelope, ENVELOPE_ID_SIZE, MAX_ENVELOPE_SIZE};

use crate::{EnvelopeStore, Result, StoreError};

/// Tree name for envelope storage.
const ENVELOPES_TREE: &str = "album_envelopes";

/// Tree name for the id index.
const INDEX_TREE: &str = "album_envelope_ids";

/// Domain separator for recipient key prefixes.
const RECIPIENT_KEY_DOMAIN: &[u8] = b"album-envelope-recipient-v1";

const PREFIX_LEN: usize = 32;
const KEY_LEN: usize = PREFIX_LEN + 8 + ENVELOPE_ID_SIZE;
const INDEX_KEY_LEN: usize = PREFIX_LEN + ENVELOPE_ID_SIZE;

fn recipient_prefix(recipient: &UserId) -> [u8; PREFIX_LEN] {
    *Hash256::hash_many(&[RECIPIENT_KEY_DOMAIN, recipient.as_str().as_bytes()]).as_bytes()
}

fn record_key(envelope: &MessageEnvelope) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    key[..PREFIX_LEN].copy_from_slice(&recipient_prefix(envelope.recipient()));
    key[PREFIX_LEN..PREFIX_LEN + 8].copy_from_slice(&envelope.sent_at().to_be_bytes());
    key[PREFIX_LEN + 8..].copy_from_slice(envelope.id().as_bytes());
    key
}

fn index_key(recipient: &UserId, id: &EnvelopeId) -> [u8; INDEX_KEY_LEN] {
    let mut key = [0u8; INDEX_KEY_LEN];
    key[..PREFIX_LEN].copy_from_slice(&recipient_prefix(recipient));
    key[PREFIX_LEN..].copy_from_slice(id.as_bytes());
    key
}

fn transaction_error(err: TransactionError<StoreError>) -> StoreError {
    match err {
        TransactionError::Abort(err) => err,
        TransactionError::Storage(err) => err.into(),
    }
}

/// Durable envelope store backed by sled.
pub struct SledEnvelopeStore {
    db: sled::Db,
    envelopes: sled::Tree,
    index: sled::Tree,
}

impl std::fmt::Debug for SledEnvelopeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledEnvelopeStore")
            .field("envelopes", &self.envelopes.len())
            .finish()
    }
}

impl SledEnvelopeStore {
    /// Open or create a store in `path`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if the database cannot be opened.
    pub fn open(path: &Path) -> Result<Self> {
        let db = sled::Config::new()
            .path(path)
            .mode(sled::Mode::LowSpace)
            .flush_every_ms(Some(1000))
            .open()
            .map_err(|e| StoreError::Database(format!("sled open: {}", e)))?;
        let store = Self::from_db(db)?;

        info!(path = %path.display(), envelopes = store.envelopes.len(), "Opened envelope store");
        Ok(store)
    }

    /// Open a throwaway store that is deleted on drop.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| StoreError::Database(format!("sled open: {}", e)))?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> Result<Self> {
        let envelopes = db
            .open_tree(ENVELOPES_TREE)
            .map_err(|e| StoreError::Database(format!("open envelopes tree: {}", e)))?;
        let index = db
            .open_tree(INDEX_TREE)
            .map_err(|e| StoreError::Database(format!("open index tree: {}", e)))?;
        Ok(Self {
            db,
            envelopes,
            index,
        })
    }

    fn decode(bytes: &[u8], recipient: &UserId) -> Result<MessageEnvelope> {
        if bytes.len() > MAX_ENVELOPE_SIZE {
            return Err(StoreError::Corrupted(format!(
                "record of {} bytes exceeds maximum {}",
                bytes.len(),
                MAX_ENVELOPE_SIZE
            )));
        }
        let envelope =
            MessageEnvelope::from_bytes(bytes).map_err(|e| StoreError::Corrupted(e.to_string()))?;
        if envelope.recipient() != recipient {
            return Err(StoreError::Corrupted(
                "record filed under the wrong recipient".into(),
            ));
        }
        Ok(envelope)
    }

    /// Key of `recipient`'s envelope with `id`, if stored.
    fn find_key(&self, recipient: &UserId, id: &EnvelopeId) -> Result<Option<sled::IVec>> {
        Ok(self.index.get(index_key(recipient, id))?)
    }
}

#[async_trait]
impl EnvelopeStore for SledEnvelopeStore {
    async fn put(&self, envelope: &MessageEnvelope) -> Result<()> {
        let bytes = envelope
            .to_bytes()
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let key = record_key(envelope);
        let id_key = index_key(envelope.recipient(), envelope.id());

        (&self.envelopes, &self.index)
            .transaction(|(envelopes, index)| -> ConflictableTransactionResult<(), StoreError> {
                if index.get(&id_key[..])?.is_some() {
                    return Err(ConflictableTransactionError::Abort(StoreError::Duplicate(
                        envelope.id().to_hex(),
                    )));
                }
                index.insert(&id_key[..], &key[..])?;
                envelopes.insert(&key[..], bytes.as_slice())?;
                Ok(())
            })
            .map_err(transaction_error)?;

        debug!(envelope = %envelope.id(), recipient = %envelope.recipient(), "Stored envelope");
        Ok(())
    }

    async fn list_for_recipient(&self, recipient: &UserId) -> Result<Vec<MessageEnvelope>> {
        self.envelopes
            .scan_prefix(recipient_prefix(recipient))
            .map(|entry| {
                let (_, value) = entry?;
                Self::decode(&value, recipient)
            })
            .collect()
    }

    async fn get(&self, recipient: &UserId, id: &EnvelopeId) -> Result<Option<MessageEnvelope>> {
        let Some(key) = self.find_key(recipient, id)? else {
            return Ok(None);
        };
        match self.envelopes.get(key)? {
            Some(value) => Ok(Some(Self::decode(&value, recipient)?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, recipient: &UserId, id: &EnvelopeId) -> Result<bool> {
        let id_key = index_key(recipient, id);
        let removed = (&self.envelopes, &self.index)
            .transaction(|(envelopes, index)| -> ConflictableTransactionResult<bool, StoreError> {
                let Some(key) = index.remove(&id_key[..])? else {
                    return Ok(false);
                };
                Ok(envelopes.remove(key)?.is_some())
            })
            .map_err(transaction_error)?;
        if removed {
            debug!(envelope = %id, recipient = %recipient, "Deleted envelope");
        }
        Ok(removed)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.envelopes.len())
    }

    async fn flush(&self) -> Result<()> {
        self.db.flush_async().await?;
        Ok(())
    }
}
