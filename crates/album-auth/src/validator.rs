//! Token validation and revocation.
//!
//! `validate` checks, in order:
//!
//! 1. the MAC, so forged or foreign tokens are `TokenUnknown`
//! 2. the registry record under the subject's lock (`TokenUnknown` if absent,
//!    `TokenRevoked` if revoked)
//! 3. expiry against the clock, on every call (`TokenExpired` once
//!    `now >= expires_at`)
//!
//! Nothing is cached and validation never mutates a record.

use std::sync::Arc;

use tracing::{debug, info, warn};

use album_identity::UserId;

use crate::{AuthConfig, AuthError, Clock, Result, SessionToken, TokenKey, TokenRegistry};

/// Checks and revokes session tokens.
pub struct TokenValidator {
    key: Arc<TokenKey>,
    registry: Arc<TokenRegistry>,
    clock: Arc<dyn Clock>,
    revocation_enabled: bool,
}

impl TokenValidator {
    /// Create a validator sharing `key` and `registry` with an issuer.
    pub fn new(
        key: Arc<TokenKey>,
        registry: Arc<TokenRegistry>,
        clock: Arc<dyn Clock>,
        config: &AuthConfig,
    ) -> Self {
        Self {
            key,
            registry,
            clock,
            revocation_enabled: config.revocation_enabled,
        }
    }

    /// Validate `token` and return its subject.
    ///
    /// # Errors
    ///
    /// Returns `TokenUnknown`, `TokenRevoked` or `TokenExpired`.
    pub fn validate(&self, token: &SessionToken) -> Result<UserId> {
        if !token.authenticates(&self.key) {
            warn!("Rejected token with invalid MAC");
            return Err(AuthError::TokenUnknown);
        }

        let subject = token.subject();
        let record = self
            .registry
            .with_user(subject, |tokens| {
                tokens.and_then(|t| t.records.get(token.nonce()).copied())
            })?
            .ok_or(AuthError::TokenUnknown)?;

        if record.revoked {
            debug!(user = %subject, "Rejected revoked token");
            return Err(AuthError::TokenRevoked);
        }
        if self.clock.now() >= record.expires_at {
            debug!(user = %subject, "Rejected expired token");
            return Err(AuthError::TokenExpired);
        }
        Ok(subject.clone())
    }

    /// Revoke `token`. Revoking an already revoked token succeeds.
    ///
    /// # Errors
    ///
    /// Returns `RevocationDisabled` when revocation is switched off and
    /// `TokenUnknown` for tokens this service did not issue.
    pub fn revoke(&self, token: &SessionToken) -> Result<()> {
        if !self.revocation_enabled {
            return Err(AuthError::RevocationDisabled);
        }
        if !token.authenticates(&self.key) {
            return Err(AuthError::TokenUnknown);
        }

        let subject = token.subject();
        let found = self.registry.with_user(subject, |tokens| {
            match tokens.and_then(|t| t.records.get_mut(token.nonce())) {
                Some(record) => {
                    record.revoked = true;
                    true
                }
                None => false,
            }
        })?;
        if !found {
            return Err(AuthError::TokenUnknown);
        }

        info!(user = %subject, "Revoked session token");
        Ok(())
    }

    /// Revoke every token of `user_id` issued under a credential generation
    /// older than `generation`, and refuse to issue such tokens from now on.
    /// Returns how many were newly revoked.
    ///
    /// Runs regardless of the revocation setting; it backs credential
    /// changes, not client requests.
    pub fn revoke_before(&self, user_id: &UserId, generation: u64) -> Result<usize> {
        let count = self.registry.with_user_mut(user_id, |tokens| {
            tokens.min_generation = tokens.min_generation.max(generation);
            let mut count = 0;
            for record in tokens.records.values_mut() {
                if record.generation < generation && !record.revoked {
                    record.revoked = true;
                    count += 1;
                }
            }
            count
        })?;
        if count > 0 {
            info!(user = %user_id, count, "Revoked session tokens of a retired credential");
        }
        Ok(count)
    }

    /// Drop registry records of tokens that have expired.
    pub fn purge_expired(&self) -> Result<usize> {
        self.registry.purge_expired(self.clock.now())
    }

    /// Whether `revoke` is available.
    pub fn revocation_enabled(&self) -> bool {
        self.revocation_enabled
    }
}

impl std::fmt::Debug for TokenValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenValidator")
            .field("revocation_enabled", &self.revocation_enabled)
            .finish_non_exhaustive()
    }
}
