//! Identity & key store.
//!
//! The store is the trust anchor of the messaging core: it generates, holds
//! and rotates every user's key pairs, answers public key lookups, and is the
//! only component that performs private-key operations. Callers pass data in
//! and get results out; secret key bytes never cross this boundary.
//!
//! ## Concurrency
//!
//! Entries are `Arc<UserKeyPair>` behind a `RwLock`. Lookups take the read
//! lock; private operations clone the `Arc` and release the lock before doing
//! any cryptography, so signing and decryption for different users (or the
//! same user) run in parallel. Registration, rotation and removal take the
//! write lock briefly.
//!
//! A poisoned lock is reported as [`IdentityError::Storage`], never a panic.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info};

use album_crypto::{SealedBox, Signature};

use crate::{IdentityError, PublicKeys, Result, UserId, UserKeyPair};

/// In-memory identity & key store.
///
/// Key material is dropped (and zeroized) when its entry is removed,
/// replaced by [`KeyStore::rekey`], or when the store itself is dropped.
#[derive(Default)]
pub struct KeyStore {
    entries: RwLock<HashMap<UserId, Arc<UserKeyPair>>>,
}

impl KeyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<UserId, Arc<UserKeyPair>>>> {
        self.entries
            .read()
            .map_err(|_| IdentityError::Storage("key store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<UserId, Arc<UserKeyPair>>>> {
        self.entries
            .write()
            .map_err(|_| IdentityError::Storage("key store lock poisoned".into()))
    }

    fn entry(&self, user_id: &UserId) -> Result<Arc<UserKeyPair>> {
        self.read()?
            .get(user_id)
            .cloned()
            .ok_or_else(|| IdentityError::UnknownIdentity(user_id.to_string()))
    }

    /// Generate and store fresh key pairs for a new user.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::DuplicateIdentity` if `user_id` already has keys.
    pub fn register(&self, user_id: &UserId) -> Result<PublicKeys> {
        let mut entries = self.write()?;
        if entries.contains_key(user_id) {
            return Err(IdentityError::DuplicateIdentity(user_id.to_string()));
        }
        let pair = UserKeyPair::generate();
        let public = *pair.public_keys();
        entries.insert(user_id.clone(), Arc::new(pair));

        info!(user = %user_id, fingerprint = %public.fingerprint(), "Registered identity keys");
        Ok(public)
    }

    /// Look up a user's public keys.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::UnknownIdentity` if the user has no keys.
    pub fn lookup_public_keys(&self, user_id: &UserId) -> Result<PublicKeys> {
        Ok(*self.entry(user_id)?.public_keys())
    }

    /// Whether `user_id` has registered keys.
    pub fn contains(&self, user_id: &UserId) -> Result<bool> {
        Ok(self.read()?.contains_key(user_id))
    }

    /// Number of registered identities.
    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read()?.is_empty())
    }

    /// Open a sealed box with `user_id`'s private encryption key.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::UnknownIdentity` for unknown users and
    /// `IdentityError::Crypto` if the box does not authenticate.
    pub fn decrypt_with_private_key(
        &self,
        user_id: &UserId,
        sealed: &SealedBox,
        aad: &[u8],
    ) -> Result<Vec<u8>> {
        let pair = self.entry(user_id)?;
        pair.open(sealed, aad)
    }

    /// Sign `data` with `user_id`'s private signing key.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::UnknownIdentity` for unknown users.
    pub fn sign_with_private_key(&self, user_id: &UserId, data: &[u8]) -> Result<Signature> {
        let pair = self.entry(user_id)?;
        Ok(pair.sign(data))
    }

    /// Replace a user's key pairs with freshly generated ones.
    ///
    /// Envelopes sealed to or signed by the previous keys can no longer be
    /// opened or verified after rotation.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::UnknownIdentity` if the user has no keys.
    pub fn rekey(&self, user_id: &UserId) -> Result<PublicKeys> {
        let mut entries = self.write()?;
        let slot = entries
            .get_mut(user_id)
            .ok_or_else(|| IdentityError::UnknownIdentity(user_id.to_string()))?;
        let pair = UserKeyPair::generate();
        let public = *pair.public_keys();
        *slot = Arc::new(pair);

        info!(user = %user_id, fingerprint = %public.fingerprint(), "Rotated identity keys");
        Ok(public)
    }

    /// Remove a user's keys. Returns whether an entry existed.
    pub fn remove(&self, user_id: &UserId) -> Result<bool> {
        let removed = self.write()?.remove(user_id).is_some();
        if removed {
            debug!(user = %user_id, "Removed identity keys");
        }
        Ok(removed)
    }
}

impl std::fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.entries.read().map(|e| e.len()).ok();
        f.debug_struct("KeyStore")
            .field("identities", &count)
            .finish()
    }
}
