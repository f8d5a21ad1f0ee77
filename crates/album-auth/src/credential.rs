//! Credential verification.
//!
//! Each enrolled user has one [`SecretVerifier`]: a random salt and the
//! BLAKE3-derived Argon2id hash of their login secret. The plaintext secret is
//! never stored or logged.
//!
//! ## Failure shape
//!
//! [`CredentialStore::verify`] answers with [`Verification`], never an error,
//! for every kind of bad input: unknown id, wrong secret, empty or oversize
//! secret, malformed id. All of them run one Argon2id derivation (against a
//! dummy record when there is no real one) and return `NotVerified`, so the
//! caller cannot tell which part was wrong from the result or the timing.
//! Deactivated and banned accounts fail the same way.
//!
//! ## Generations
//!
//! Every credential carries a generation number, drawn from a counter that
//! only grows. Replacing the secret or withdrawing the account's access moves
//! it forward. A [`VerifiedLogin`] remembers the generation it was checked
//! against, so tokens for a login that raced a credential change can be
//! refused at issue time.

use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use subtle::Choice;
use tracing::{debug, info};
use zeroize::Zeroizing;

use album_crypto::{SecretHashParams, SecretVerifier};
use album_identity::UserId;

use crate::{AuthError, Result};

/// Argon2id cost parameters for credential verifiers.
pub type CredentialParams = SecretHashParams;

/// Maximum accepted secret length in bytes.
pub const MAX_SECRET_LEN: usize = 1024;

/// Successful logins remembered per user. Older entries are dropped.
pub const MAX_LOGIN_HISTORY: usize = 50;

/// Standing of an account. Only active accounts can log in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountStatus {
    /// Normal account.
    #[default]
    Active,
    /// Closed by its owner or an operator.
    Deactivated,
    /// Suspended by an operator.
    Banned,
}

impl AccountStatus {
    /// Whether the account may log in.
    pub fn is_active(&self) -> bool {
        matches!(self, AccountStatus::Active)
    }
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AccountStatus::Active => "active",
            AccountStatus::Deactivated => "deactivated",
            AccountStatus::Banned => "banned",
        };
        f.write_str(name)
    }
}

/// One successful login.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRecord {
    /// Unix time of the login, in seconds.
    pub at: u64,
    /// Client address, when the caller knows it.
    pub client: Option<IpAddr>,
}

struct CredentialRecord {
    verifier: SecretVerifier,
    status: AccountStatus,
    generation: u64,
    logins: VecDeque<LoginRecord>,
}

/// Proof that a login succeeded.
///
/// Only [`CredentialStore::verify`] can construct one, so a token can only be
/// issued after a successful verification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifiedLogin {
    subject: UserId,
    generation: u64,
}

impl VerifiedLogin {
    /// The authenticated user.
    pub fn subject(&self) -> &UserId {
        &self.subject
    }

    /// Credential generation the secret was checked against.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Outcome of a credential check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verification {
    /// The secret matched the enrolled credential.
    Verified(VerifiedLogin),
    /// Unknown user, wrong secret, inactive account, or malformed input.
    NotVerified,
}

impl Verification {
    /// Whether the login succeeded.
    pub fn is_verified(&self) -> bool {
        matches!(self, Verification::Verified(_))
    }
}

/// Enrolled credentials.
pub struct CredentialStore {
    params: CredentialParams,
    records: RwLock<HashMap<UserId, CredentialRecord>>,
    dummy: SecretVerifier,
    generations: AtomicU64,
}

impl CredentialStore {
    /// Create an empty store with the given hashing cost.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Crypto` if `params` are rejected by Argon2.
    pub fn new(params: CredentialParams) -> Result<Self> {
        params.validate()?;
        let mut filler = Zeroizing::new([0u8; 32]);
        OsRng.fill_bytes(&mut filler[..]);
        let dummy = SecretVerifier::derive(&filler[..], &params)?;
        Ok(Self {
            params,
            records: RwLock::new(HashMap::new()),
            dummy,
            generations: AtomicU64::new(1),
        })
    }

    fn next_generation(&self) -> u64 {
        self.generations.fetch_add(1, Ordering::Relaxed)
    }

    /// Hashing cost in use.
    pub fn params(&self) -> &CredentialParams {
        &self.params
    }

    /// Enroll a credential for a new user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::DuplicateIdentity` if the user is already enrolled
    /// and `AuthError::InvalidSecret` for an empty or oversize secret.
    pub fn enroll(&self, user_id: &UserId, secret: &[u8]) -> Result<()> {
        check_secret(secret)?;
        let verifier = SecretVerifier::derive(secret, &self.params)?;

        let mut records = self.records.write().map_err(|_| AuthError::poisoned("credential"))?;
        if records.contains_key(user_id) {
            return Err(AuthError::DuplicateIdentity(user_id.to_string()));
        }
        records.insert(
            user_id.clone(),
            CredentialRecord {
                verifier,
                status: AccountStatus::Active,
                generation: self.next_generation(),
                logins: VecDeque::new(),
            },
        );

        info!(user = %user_id, "Enrolled credential");
        Ok(())
    }

    /// Replace an enrolled credential with a fresh salt and verifier.
    /// Returns the new credential generation.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UnknownIdentity` if the user is not enrolled.
    pub fn replace(&self, user_id: &UserId, new_secret: &[u8]) -> Result<u64> {
        check_secret(new_secret)?;
        let verifier = SecretVerifier::derive(new_secret, &self.params)?;

        let mut records = self.records.write().map_err(|_| AuthError::poisoned("credential"))?;
        let record = records
            .get_mut(user_id)
            .ok_or_else(|| AuthError::UnknownIdentity(user_id.to_string()))?;
        record.verifier = verifier;
        record.generation = self.next_generation();

        info!(user = %user_id, "Replaced credential");
        Ok(record.generation)
    }

    /// Set the account status. Returns the credential generation afterwards;
    /// it moves forward whenever the account stops being active.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UnknownIdentity` if the user is not enrolled.
    pub fn set_status(&self, user_id: &UserId, status: AccountStatus) -> Result<u64> {
        let mut records = self.records.write().map_err(|_| AuthError::poisoned("credential"))?;
        let record = records
            .get_mut(user_id)
            .ok_or_else(|| AuthError::UnknownIdentity(user_id.to_string()))?;
        if record.status != status {
            info!(user = %user_id, from = %record.status, to = %status, "Changed account status");
            record.status = status;
        }
        if !status.is_active() {
            record.generation = self.next_generation();
        }
        Ok(record.generation)
    }

    /// Current account status.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UnknownIdentity` if the user is not enrolled.
    pub fn status(&self, user_id: &UserId) -> Result<AccountStatus> {
        let records = self.records.read().map_err(|_| AuthError::poisoned("credential"))?;
        records
            .get(user_id)
            .map(|r| r.status)
            .ok_or_else(|| AuthError::UnknownIdentity(user_id.to_string()))
    }

    /// Append a successful login to the user's history, dropping the oldest
    /// entry beyond [`MAX_LOGIN_HISTORY`].
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UnknownIdentity` if the user is not enrolled.
    pub fn record_login(&self, user_id: &UserId, login: LoginRecord) -> Result<()> {
        let mut records = self.records.write().map_err(|_| AuthError::poisoned("credential"))?;
        let record = records
            .get_mut(user_id)
            .ok_or_else(|| AuthError::UnknownIdentity(user_id.to_string()))?;
        if record.logins.len() == MAX_LOGIN_HISTORY {
            record.logins.pop_front();
        }
        record.logins.push_back(login);
        Ok(())
    }

    /// Recent successful logins, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UnknownIdentity` if the user is not enrolled.
    pub fn login_history(&self, user_id: &UserId) -> Result<Vec<LoginRecord>> {
        let records = self.records.read().map_err(|_| AuthError::poisoned("credential"))?;
        records
            .get(user_id)
            .map(|r| r.logins.iter().copied().collect())
            .ok_or_else(|| AuthError::UnknownIdentity(user_id.to_string()))
    }

    /// Remove a user's credential. Returns whether one existed.
    pub fn remove(&self, user_id: &UserId) -> Result<bool> {
        let mut records = self.records.write().map_err(|_| AuthError::poisoned("credential"))?;
        Ok(records.remove(user_id).is_some())
    }

    /// Whether a credential is enrolled for `user_id`.
    pub fn contains(&self, user_id: &UserId) -> Result<bool> {
        let records = self.records.read().map_err(|_| AuthError::poisoned("credential"))?;
        Ok(records.contains_key(user_id))
    }

    /// Check a login secret.
    ///
    /// `user_id` is taken unparsed so malformed ids follow the same path as
    /// unknown ones.
    ///
    /// # Errors
    ///
    /// Only fails with `AuthError::Storage` if the credential map is
    /// unavailable; every bad input yields `Ok(Verification::NotVerified)`.
    pub fn verify(&self, user_id: &str, secret: &[u8]) -> Result<Verification> {
        let subject = UserId::new(user_id).ok();
        let record = {
            let records = self.records.read().map_err(|_| AuthError::poisoned("credential"))?;
            subject
                .as_ref()
                .and_then(|id| records.get(id))
                .map(|r| (r.verifier.clone(), r.status, r.generation))
        };

        let well_formed = check_secret(secret).is_ok();
        let known = Choice::from(record.is_some() as u8);
        let (verifier, active, generation) = match &record {
            Some((verifier, status, generation)) => (verifier, status.is_active(), *generation),
            None => (&self.dummy, false, 0),
        };
        // Oversize input is hashed as empty so its cost matches a normal attempt.
        let candidate: &[u8] = if well_formed { secret } else { b"" };
        let matched = Choice::from(verifier.matches(candidate, &self.params) as u8);

        let accepted: bool = (known
            & matched
            & Choice::from(well_formed as u8)
            & Choice::from(active as u8))
        .into();
        match subject {
            Some(subject) if accepted => {
                debug!(user = %subject, "Credential verified");
                Ok(Verification::Verified(VerifiedLogin {
                    subject,
                    generation,
                }))
            }
            _ => {
                debug!("Credential rejected");
                Ok(Verification::NotVerified)
            }
        }
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let enrolled = self.records.read().map(|r| r.len()).ok();
        f.debug_struct("CredentialStore")
            .field("params", &self.params)
            .field("enrolled", &enrolled)
            .finish()
    }
}

fn check_secret(secret: &[u8]) -> Result<()> {
    if secret.is_empty() {
        return Err(AuthError::InvalidSecret {
            reason: "secret is empty".into(),
        });
    }
    if secret.len() > MAX_SECRET_LEN {
        return Err(AuthError::InvalidSecret {
            reason: format!("secret longer than {} bytes", MAX_SECRET_LEN),
        });
    }
    Ok(())
}
