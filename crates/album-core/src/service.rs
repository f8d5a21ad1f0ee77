//! The messaging service facade.
//!
//! [`AlbumService`] wires the credential store, token issuer and validator,
//! key store, codec and envelope store together. Every operation after login
//! starts by validating the caller's session token; the token's subject is the
//! acting user.
//!
//! ## Flow
//!
//! ```text
//! login:   CredentialStore::verify -> TokenIssuer::issue
//! send:    TokenValidator::validate -> MessageCodec::encrypt_and_sign -> EnvelopeStore::put
//! receive: TokenValidator::validate -> EnvelopeStore::list_for_recipient
//! open:    TokenValidator::validate -> MessageCodec::verify_and_decrypt
//! ```
//!
//! Argon2id work runs on the blocking thread pool so it never stalls the
//! async executor.
//!
//! ## Cancellation
//!
//! A blocking task keeps running when the future awaiting it is dropped. Each
//! operation that changes account state therefore does all of its state
//! changes inside one blocking closure, with nothing left to do after the
//! `.await`. Dropping `register_user` or `change_secret` mid-flight either
//! leaves no trace or completes the whole change.

use std::net::IpAddr;
use std::sync::Arc;

use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use album_auth::{
    AccountStatus, Clock, CredentialStore, LoginRecord, SessionToken, SystemClock, TokenIssuer,
    TokenKey, TokenRegistry, TokenValidator, Verification,
};
use album_identity::{KeyStore, PublicKeys, UserId};
use album_protocol::{EnvelopeId, MessageCodec, MessageEnvelope};
use album_store::{EnvelopeStore, MemoryEnvelopeStore, SledEnvelopeStore};

use crate::{CoreConfig, CoreError, Result};

/// Sub-directory of the data dir holding the envelope database.
const ENVELOPE_DB_DIR: &str = "envelopes";

/// Authenticated, end-to-end encrypted direct messaging.
pub struct AlbumService {
    config: CoreConfig,
    keys: Arc<KeyStore>,
    credentials: Arc<CredentialStore>,
    issuer: TokenIssuer,
    validator: Arc<TokenValidator>,
    codec: MessageCodec,
    envelopes: Arc<dyn EnvelopeStore>,
    clock: Arc<dyn Clock>,
}

impl AlbumService {
    /// Create a service with the system clock and the store selected by
    /// `config.storage`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Config` for an invalid configuration and
    /// `CoreError::ServiceUnavailable` if the envelope database cannot be
    /// opened.
    pub fn new(config: CoreConfig) -> Result<Self> {
        config.validate()?;
        let envelopes: Arc<dyn EnvelopeStore> = if config.storage.in_memory {
            Arc::new(MemoryEnvelopeStore::new())
        } else {
            let path = config.storage.data_dir.join(ENVELOPE_DB_DIR);
            Arc::new(SledEnvelopeStore::open(&path)?)
        };
        Self::with_components(config, envelopes, Arc::new(SystemClock))
    }

    /// In-memory service with cheap credential hashing, for tests.
    pub fn in_memory() -> Result<Self> {
        Self::new(CoreConfig::testing())
    }

    /// Create a service with an explicit envelope store and clock.
    pub fn with_components(
        config: CoreConfig,
        envelopes: Arc<dyn EnvelopeStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;

        let key = Arc::new(TokenKey::generate());
        let registry = Arc::new(TokenRegistry::new());
        let issuer = TokenIssuer::new(key.clone(), registry.clone(), clock.clone(), &config.auth);
        let validator = Arc::new(TokenValidator::new(key, registry, clock.clone(), &config.auth));

        let keys = Arc::new(KeyStore::new());
        let codec =
            MessageCodec::with_max_plaintext_size(keys.clone(), config.messaging.max_plaintext_size);
        let credentials = Arc::new(CredentialStore::new(config.auth.credential)?);

        debug!(
            ttl_secs = config.auth.ttl_secs,
            revocation = config.auth.revocation_enabled,
            in_memory = config.storage.in_memory,
            "Created AlbumService"
        );
        Ok(Self {
            config,
            keys,
            credentials,
            issuer,
            validator,
            codec,
            envelopes,
            clock,
        })
    }

    /// Effective configuration.
    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    async fn blocking<T, F>(f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        tokio::task::spawn_blocking(f)
            .await
            .map_err(|e| CoreError::ServiceUnavailable(format!("worker failed: {}", e)))?
    }

    fn authenticate(&self, token: &SessionToken) -> Result<UserId> {
        Ok(self.validator.validate(token)?)
    }

    // ==================== Provisioning ====================

    /// Create a user: enroll their login secret and generate their keys.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateIdentity` if the id is taken and `InvalidRequest`
    /// for a malformed id or unusable secret.
    pub async fn register_user(&self, user_id: &str, secret: &[u8]) -> Result<PublicKeys> {
        let user_id = UserId::new(user_id)?;
        let keys = Arc::clone(&self.keys);
        let credentials = Arc::clone(&self.credentials);
        let secret = Zeroizing::new(secret.to_vec());

        Self::blocking(move || {
            // Key registration claims the id atomically; a second caller for
            // the same id stops here.
            let public = keys.register(&user_id)?;
            if let Err(err) = credentials.enroll(&user_id, &secret) {
                keys.remove(&user_id)?;
                return Err(err.into());
            }
            info!(user = %user_id, "Registered user");
            Ok(public)
        })
        .await
    }

    /// Whether a user with this id exists. Malformed ids do not exist.
    pub async fn has_user(&self, user_id: &str) -> Result<bool> {
        match UserId::new(user_id) {
            Ok(id) => Ok(self.keys.contains(&id)? && self.credentials.contains(&id)?),
            Err(_) => Ok(false),
        }
    }

    /// Set a user's account status. Leaving `Active` revokes every session
    /// of the user and blocks logins until reactivated.
    ///
    /// # Errors
    ///
    /// Returns `UnknownIdentity` if the user does not exist.
    pub async fn set_account_status(&self, user_id: &str, status: AccountStatus) -> Result<()> {
        let id = UserId::new(user_id)
            .map_err(|_| CoreError::UnknownIdentity(user_id.to_string()))?;
        let generation = self.credentials.set_status(&id, status)?;
        if !status.is_active() {
            self.validator.revoke_before(&id, generation)?;
        }
        Ok(())
    }

    /// A user's account status.
    ///
    /// # Errors
    ///
    /// Returns `UnknownIdentity` if the user does not exist.
    pub async fn account_status(&self, user_id: &str) -> Result<AccountStatus> {
        let id = UserId::new(user_id)
            .map_err(|_| CoreError::UnknownIdentity(user_id.to_string()))?;
        Ok(self.credentials.status(&id)?)
    }

    /// Public keys of a user, for out-of-band fingerprint comparison.
    pub async fn lookup_public_keys(&self, user_id: &str) -> Result<PublicKeys> {
        let id = UserId::new(user_id)
            .map_err(|_| CoreError::UnknownIdentity(user_id.to_string()))?;
        Ok(self.keys.lookup_public_keys(&id)?)
    }

    // ==================== Sessions ====================

    /// Check a login secret and issue a session token.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCredential` for an unknown user, a wrong secret, an
    /// inactive account, or malformed input alike.
    pub async fn login(&self, user_id: &str, secret: &[u8]) -> Result<SessionToken> {
        self.login_from(user_id, secret, None).await
    }

    /// [`AlbumService::login`], recording the client address in the user's
    /// login history.
    pub async fn login_from(
        &self,
        user_id: &str,
        secret: &[u8],
        client: Option<IpAddr>,
    ) -> Result<SessionToken> {
        let credentials = Arc::clone(&self.credentials);
        let user_id = user_id.to_string();
        let secret = Zeroizing::new(secret.to_vec());
        let outcome = Self::blocking(move || Ok(credentials.verify(&user_id, &secret)?)).await?;

        match outcome {
            Verification::Verified(login) => {
                let token = self.issuer.issue(&login)?;
                let record = LoginRecord {
                    at: token.issued_at(),
                    client,
                };
                self.credentials.record_login(login.subject(), record)?;
                Ok(token)
            }
            Verification::NotVerified => {
                warn!("Login rejected");
                Err(CoreError::InvalidCredential)
            }
        }
    }

    /// Revoke a session token.
    ///
    /// # Errors
    ///
    /// Returns `RevocationDisabled` when revocation is switched off.
    pub async fn revoke_token(&self, token: &SessionToken) -> Result<()> {
        Ok(self.validator.revoke(token)?)
    }

    /// Change the caller's login secret. Every outstanding token of the user,
    /// including `token`, is revoked.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCredential` if `old_secret` does not match.
    pub async fn change_secret(
        &self,
        token: &SessionToken,
        old_secret: &[u8],
        new_secret: &[u8],
    ) -> Result<()> {
        let subject = self.authenticate(token)?;

        let credentials = Arc::clone(&self.credentials);
        let old_secret = Zeroizing::new(old_secret.to_vec());
        let new_secret = Zeroizing::new(new_secret.to_vec());
        let validator = Arc::clone(&self.validator);
        Self::blocking(move || match credentials.verify(subject.as_str(), &old_secret)? {
            Verification::Verified(_) => {
                let generation = credentials.replace(&subject, &new_secret)?;
                let revoked = validator.revoke_before(&subject, generation)?;
                info!(user = %subject, revoked, "Changed login secret");
                Ok(())
            }
            Verification::NotVerified => Err(CoreError::InvalidCredential),
        })
        .await
    }

    /// The caller's recent successful logins, oldest first.
    pub async fn login_history(&self, token: &SessionToken) -> Result<Vec<LoginRecord>> {
        let user = self.authenticate(token)?;
        Ok(self.credentials.login_history(&user)?)
    }

    /// Drop expired token records. Returns how many were removed.
    pub async fn purge_expired_tokens(&self) -> Result<usize> {
        Ok(self.validator.purge_expired()?)
    }

    // ==================== Messaging ====================

    /// Encrypt `plaintext` to `recipient`, sign it as the caller, and store
    /// the envelope for the recipient.
    ///
    /// # Errors
    ///
    /// Token errors, `UnknownIdentity`, `PayloadTooLarge`, or
    /// `ServiceUnavailable` if the envelope cannot be stored. A failed send
    /// stores nothing.
    pub async fn send_message(
        &self,
        token: &SessionToken,
        recipient: &str,
        plaintext: &[u8],
    ) -> Result<MessageEnvelope> {
        let sender = self.authenticate(token)?;
        let recipient = UserId::new(recipient)
            .map_err(|_| CoreError::UnknownIdentity(recipient.to_string()))?;

        let envelope =
            self.codec
                .encrypt_and_sign(&sender, &recipient, plaintext, self.clock.now())?;
        self.envelopes.put(&envelope).await?;

        info!(
            envelope = %envelope.id(),
            sender = %sender,
            recipient = %recipient,
            "Message sent"
        );
        Ok(envelope)
    }

    /// Envelopes addressed to the caller, oldest first. Still encrypted; open
    /// them with [`AlbumService::open_message`].
    pub async fn receive_messages(&self, token: &SessionToken) -> Result<Vec<MessageEnvelope>> {
        let user = self.authenticate(token)?;
        let envelopes = self.envelopes.list_for_recipient(&user).await?;
        debug!(user = %user, count = envelopes.len(), "Listed envelopes");
        Ok(envelopes)
    }

    /// Verify and decrypt an envelope addressed to the caller.
    ///
    /// # Errors
    ///
    /// Token errors, then `UnknownIdentity`, `RecipientMismatch`,
    /// `SignatureInvalid` or `DecryptionFailed`.
    pub async fn open_message(
        &self,
        token: &SessionToken,
        envelope: &MessageEnvelope,
    ) -> Result<Vec<u8>> {
        let user = self.authenticate(token)?;
        Ok(self.codec.verify_and_decrypt(envelope, &user)?)
    }

    /// Delete one of the caller's envelopes. Returns whether it existed.
    pub async fn delete_message(&self, token: &SessionToken, id: &EnvelopeId) -> Result<bool> {
        let user = self.authenticate(token)?;
        Ok(self.envelopes.delete(&user, id).await?)
    }

    /// Rotate the caller's identity keys.
    ///
    /// Envelopes already sent to the caller can no longer be opened.
    pub async fn rekey(&self, token: &SessionToken) -> Result<PublicKeys> {
        let user = self.authenticate(token)?;
        Ok(self.keys.rekey(&user)?)
    }

    /// Flush the envelope store.
    pub async fn flush(&self) -> Result<()> {
        Ok(self.envelopes.flush().await?)
    }
}

impl std::fmt::Debug for AlbumService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlbumService")
            .field("keys", &self.keys)
            .field("credentials", &self.credentials)
            .field("validator", &self.validator)
            .finish_non_exhaustive()
    }
}
