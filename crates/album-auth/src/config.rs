//! Authentication settings.

use serde::{Deserialize, Serialize};

use crate::CredentialParams;

/// Default session token lifetime (1 hour).
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 60 * 60;

/// Authentication configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Session token lifetime in seconds.
    pub ttl_secs: u64,

    /// Whether tokens can be revoked before they expire.
    ///
    /// When disabled, `revoke` fails with `RevocationDisabled` and tokens
    /// stay valid until expiry.
    pub revocation_enabled: bool,

    /// Argon2id cost for credential verifiers.
    pub credential: CredentialParams,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            revocation_enabled: true,
            credential: CredentialParams::default(),
        }
    }
}

impl AuthConfig {
    /// Set the token lifetime.
    pub fn with_ttl_secs(mut self, ttl_secs: u64) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }

    /// Enable or disable revocation.
    pub fn with_revocation(mut self, enabled: bool) -> Self {
        self.revocation_enabled = enabled;
        self
    }

    /// Set the credential hashing cost.
    pub fn with_credential_params(mut self, params: CredentialParams) -> Self {
        self.credential = params;
        self
    }
}
