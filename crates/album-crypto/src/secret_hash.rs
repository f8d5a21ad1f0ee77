//! Argon2id secret hashing.
//!
//! Login secrets are never stored. Each credential keeps a random salt and a
//! verifier: `BLAKE3-derive(Argon2id(secret, salt))`. Checking a secret
//! re-derives the verifier and compares in constant time.

use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{CryptoError, Result};

/// Salt size in bytes.
pub const SALT_SIZE: usize = 32;

/// Verifier size in bytes.
pub const VERIFIER_SIZE: usize = 32;

/// Domain separation for credential verifiers.
const VERIFIER_CONTEXT: &str = "album credential verifier v1";

/// Argon2id cost parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretHashParams {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    /// Number of passes.
    pub iterations: u32,
    /// Degree of parallelism.
    pub parallelism: u32,
}

impl Default for SecretHashParams {
    /// Hardened parameters: 64 MiB, 3 passes, 4 lanes.
    fn default() -> Self {
        Self {
            memory_kib: 64 * 1024,
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl SecretHashParams {
    /// Minimal parameters for tests. Never use in production.
    pub fn testing() -> Self {
        Self {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        }
    }

    /// Check the parameters are accepted by Argon2.
    pub fn validate(&self) -> Result<()> {
        self.argon2().map(|_| ())
    }

    fn argon2(&self) -> Result<Argon2<'static>> {
        let params = Params::new(
            self.memory_kib,
            self.iterations,
            self.parallelism,
            Some(VERIFIER_SIZE),
        )
        .map_err(|e| CryptoError::SecretHash(e.to_string()))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

/// Stored credential verifier. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop, Serialize, Deserialize)]
pub struct SecretVerifier {
    salt: [u8; SALT_SIZE],
    verifier: [u8; VERIFIER_SIZE],
}

impl SecretVerifier {
    /// Derive a verifier for `secret` with a fresh random salt.
    pub fn derive(secret: &[u8], params: &SecretHashParams) -> Result<Self> {
        let mut salt = [0u8; SALT_SIZE];
        OsRng.fill_bytes(&mut salt);
        Self::derive_with_salt(secret, salt, params)
    }

    /// Derive a verifier for `secret` with the given salt.
    pub fn derive_with_salt(
        secret: &[u8],
        salt: [u8; SALT_SIZE],
        params: &SecretHashParams,
    ) -> Result<Self> {
        let verifier = compute(secret, &salt, params)?;
        Ok(Self { salt, verifier })
    }

    /// Check `secret` against this verifier in constant time.
    ///
    /// Parameter errors count as a mismatch.
    pub fn matches(&self, secret: &[u8], params: &SecretHashParams) -> bool {
        match compute(secret, &self.salt, params) {
            Ok(mut candidate) => {
                let equal: bool = candidate.ct_eq(&self.verifier).into();
                candidate.zeroize();
                equal
            }
            Err(_) => false,
        }
    }
}

impl std::fmt::Debug for SecretVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretVerifier([REDACTED])")
    }
}

fn compute(
    secret: &[u8],
    salt: &[u8; SALT_SIZE],
    params: &SecretHashParams,
) -> Result<[u8; VERIFIER_SIZE]> {
    let mut output = [0u8; VERIFIER_SIZE];
    params
        .argon2()?
        .hash_password_into(secret, salt, &mut output)
        .map_err(|e| CryptoError::SecretHash(e.to_string()))?;
    let verifier = blake3::derive_key(VERIFIER_CONTEXT, &output);
    output.zeroize();
    Ok(verifier)
}
