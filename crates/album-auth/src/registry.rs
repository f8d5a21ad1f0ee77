//! Token issuance and revocation records.
//!
//! The registry is shared by the issuer and the validator. Records are grouped
//! per user: an outer `RwLock` maps each user to their own `Mutex`, and every
//! issue, validate, or revoke for a user runs under that user's mutex. Work for
//! unrelated users only shares the brief outer read lock.
//!
//! Because revocation and validation serialize on the same mutex, a revoke
//! that has returned is observed by every later validation.
//!
//! Each user also carries a credential generation floor. Tokens are refused
//! for logins verified below the floor, and revoking below it catches tokens
//! already issued, so a credential change leaves no window in either order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use tracing::debug;

use album_identity::UserId;

use crate::token::TOKEN_NONCE_SIZE;
use crate::{AuthError, Result};

/// Issuance record of one token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct TokenRecord {
    pub expires_at: u64,
    pub revoked: bool,
    /// Credential generation of the login the token was issued for.
    pub generation: u64,
}

/// All token records for one user, keyed by token nonce.
#[derive(Debug, Default)]
pub(crate) struct UserTokens {
    pub records: HashMap<[u8; TOKEN_NONCE_SIZE], TokenRecord>,
    /// Lowest credential generation still allowed to hold tokens.
    pub min_generation: u64,
}

impl UserTokens {
    /// Nothing worth keeping: no records and no generation floor.
    fn is_idle(&self) -> bool {
        self.records.is_empty() && self.min_generation == 0
    }
}

/// Shared record of issued and revoked tokens.
#[derive(Default)]
pub struct TokenRegistry {
    users: RwLock<HashMap<UserId, Arc<Mutex<UserTokens>>>>,
}

impl TokenRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Existing per-user slot, if any.
    fn slot(&self, user_id: &UserId) -> Result<Option<Arc<Mutex<UserTokens>>>> {
        let users = self.users.read().map_err(|_| AuthError::poisoned("token registry"))?;
        Ok(users.get(user_id).cloned())
    }

    /// Per-user slot, created on first use.
    fn slot_or_insert(&self, user_id: &UserId) -> Result<Arc<Mutex<UserTokens>>> {
        if let Some(slot) = self.slot(user_id)? {
            return Ok(slot);
        }
        let mut users = self.users.write().map_err(|_| AuthError::poisoned("token registry"))?;
        Ok(Arc::clone(users.entry(user_id.clone()).or_default()))
    }

    /// Run `f` under `user_id`'s lock, creating the slot if needed.
    pub(crate) fn with_user_mut<T>(
        &self,
        user_id: &UserId,
        f: impl FnOnce(&mut UserTokens) -> T,
    ) -> Result<T> {
        let slot = self.slot_or_insert(user_id)?;
        let mut tokens = slot.lock().map_err(|_| AuthError::poisoned("user token"))?;
        Ok(f(&mut tokens))
    }

    /// Run `f` under `user_id`'s lock. `f` sees `None` if the user has no
    /// records yet; no slot is created.
    pub(crate) fn with_user<T>(
        &self,
        user_id: &UserId,
        f: impl FnOnce(Option<&mut UserTokens>) -> T,
    ) -> Result<T> {
        match self.slot(user_id)? {
            Some(slot) => {
                let mut tokens = slot.lock().map_err(|_| AuthError::poisoned("user token"))?;
                Ok(f(Some(&mut tokens)))
            }
            None => Ok(f(None)),
        }
    }

    /// Drop records whose expiry is at or before `now`, then drop user slots
    /// left idle.
    ///
    /// Expired tokens already fail validation; purging only bounds memory.
    /// Returns the number of records removed.
    pub(crate) fn purge_expired(&self, now: u64) -> Result<usize> {
        let mut users = self.users.write().map_err(|_| AuthError::poisoned("token registry"))?;
        let users_before = users.len();
        let mut removed = 0;
        let mut poisoned = false;

        users.retain(|_, slot| {
            let Ok(mut tokens) = slot.lock() else {
                poisoned = true;
                return true;
            };
            let before = tokens.records.len();
            tokens.records.retain(|_, record| record.expires_at > now);
            removed += before - tokens.records.len();
            // Every clone of a slot is taken under the outer lock, which we
            // hold, so a count of one means no caller is about to use it.
            !(tokens.is_idle() && Arc::strong_count(slot) == 1)
        });
        if poisoned {
            return Err(AuthError::poisoned("user token"));
        }

        let dropped = users_before - users.len();
        if removed > 0 || dropped > 0 {
            debug!(removed, dropped_users = dropped, "Purged expired token records");
        }
        Ok(removed)
    }

    /// Number of users with a registry slot.
    pub fn user_count(&self) -> Result<usize> {
        let users = self.users.read().map_err(|_| AuthError::poisoned("token registry"))?;
        Ok(users.len())
    }

    /// Number of token records held for `user_id`.
    pub fn record_count(&self, user_id: &UserId) -> Result<usize> {
        self.with_user(user_id, |tokens| tokens.map_or(0, |t| t.records.len()))
    }
}

impl std::fmt::Debug for TokenRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let users = self.users.read().map(|u| u.len()).ok();
        f.debug_struct("TokenRegistry").field("users", &users).finish()
    }
}
