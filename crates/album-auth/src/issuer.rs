//! Token issuance.

use std::sync::Arc;

use tracing::info;

use crate::registry::TokenRecord;
use crate::{
    AuthConfig, AuthError, Clock, Result, SessionToken, TokenKey, TokenRegistry, VerifiedLogin,
};

/// Mints session tokens for verified logins.
pub struct TokenIssuer {
    key: Arc<TokenKey>,
    registry: Arc<TokenRegistry>,
    clock: Arc<dyn Clock>,
    ttl_secs: u64,
}

impl TokenIssuer {
    /// Create an issuer sharing `key` and `registry` with a validator.
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
            ttl_secs: config.ttl_secs,
        }
    }

    /// Token lifetime in seconds.
    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Issue a token for `login` and record it in the registry.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::StaleLogin` if the user's credential changed after
    /// `login` was verified, and `AuthError::Storage` if the registry is
    /// unavailable.
    pub fn issue(&self, login: &VerifiedLogin) -> Result<SessionToken> {
        let subject = login.subject();
        let token = SessionToken::mint(&self.key, subject.clone(), self.clock.now(), self.ttl_secs);
        let record = TokenRecord {
            expires_at: token.expires_at(),
            revoked: false,
            generation: login.generation(),
        };
        self.registry.with_user_mut(subject, |tokens| {
            if login.generation() < tokens.min_generation {
                return Err(AuthError::StaleLogin);
            }
            tokens.records.insert(*token.nonce(), record);
            Ok(())
        })??;

        info!(user = %subject, expires_at = token.expires_at(), "Issued session token");
        Ok(token)
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}
