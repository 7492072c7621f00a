//! Argon2id password hashing with versioned parameters.
//!
//! Every stored password carries the parameters it was hashed with
//! ([`PasswordRecord::params`]). Verification always recomputes with those
//! stored parameters, while new hashes are stamped with the hasher's current
//! defaults. Raising the defaults therefore upgrades accounts transparently
//! the next time their password is set.

use std::fmt;

use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::error::{CryptoError, CryptoResult};
use crate::random::random_string;

/// Number of alphanumeric characters in a freshly generated salt.
pub const SALT_LEN: usize = 16;

/// Argon2 version 1.3.
const ARGON2_VERSION_13: u32 = 0x13;

/// Tunable key-derivation parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HashParams {
    /// Length of the derived key in bytes.
    pub key_len: u32,
    /// Memory cost in KiB.
    pub memory_kib: u32,
    /// Degree of parallelism (lanes).
    pub parallelism: u8,
    /// Number of passes over memory.
    pub time_cost: u32,
    /// Argon2 algorithm version identifier.
    pub version: u32,
}

impl HashParams {
    /// Parameters implied by credential files written before parameters were
    /// stored per user.
    pub const LEGACY: Self = Self {
        key_len: 32,
        memory_kib: 1024 * 1024,
        parallelism: 4,
        time_cost: 1,
        version: ARGON2_VERSION_13,
    };

    /// The smallest parameters Argon2 accepts. Offers no meaningful
    /// protection; intended for tests and throwaway environments.
    pub const MINIMUM: Self = Self {
        key_len: 32,
        memory_kib: 8,
        parallelism: 1,
        time_cost: 1,
        version: ARGON2_VERSION_13,
    };

    fn argon2(&self) -> CryptoResult<Argon2<'static>> {
        let version = Version::try_from(self.version)
            .map_err(|e| CryptoError::InvalidParams(format!("version {:#x}: {e}", self.version)))?;
        let params = Params::new(
            self.memory_kib,
            self.time_cost,
            u32::from(self.parallelism),
            Some(self.key_len as usize),
        )
        .map_err(|e| CryptoError::InvalidParams(e.to_string()))?;
        Ok(Argon2::new(Algorithm::Argon2id, version, params))
    }
}

impl Default for HashParams {
    fn default() -> Self {
        Self {
            key_len: 32,
            memory_kib: 64 * 1024,
            parallelism: 4,
            time_cost: 1,
            version: ARGON2_VERSION_13,
        }
    }
}

/// A stored password: hex digest, salt, and the parameters used to derive it.
///
/// The plaintext password is never part of this structure.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordRecord {
    pub digest: String,
    pub salt: String,
    pub params: HashParams,
}

impl fmt::Debug for PasswordRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordRecord")
            .field("digest", &"<redacted>")
            .field("salt", &"<redacted>")
            .field("params", &self.params)
            .finish()
    }
}

/// Produces and verifies password hashes.
///
/// Holds the current default parameters; they come from configuration and
/// are fixed for the lifetime of the hasher.
#[derive(Clone, Debug)]
pub struct PasswordHasher {
    params: HashParams,
}

impl PasswordHasher {
    /// Create a hasher stamping `params` onto new hashes.
    ///
    /// Fails if Argon2 rejects the parameters, so misconfiguration surfaces
    /// at startup rather than on the first login.
    pub fn new(params: HashParams) -> CryptoResult<Self> {
        params.argon2()?;
        Ok(Self { params })
    }

    /// The current default parameters.
    pub fn params(&self) -> &HashParams {
        &self.params
    }

    /// Hex-encoded Argon2id digest of `password` under `salt` and `params`.
    ///
    /// Deterministic for identical inputs.
    pub fn hash(password: &str, salt: &str, params: &HashParams) -> CryptoResult<String> {
        let argon2 = params.argon2()?;
        let mut out = vec![0u8; params.key_len as usize];
        argon2
            .hash_password_into(password.as_bytes(), salt.as_bytes(), &mut out)
            .map_err(|e| CryptoError::Hash(e.to_string()))?;
        Ok(hex::encode(out))
    }

    /// A fresh random salt of [`SALT_LEN`] characters.
    pub fn new_salt() -> CryptoResult<String> {
        random_string(SALT_LEN)
    }

    /// Hash `password` with a new salt and the current default parameters.
    pub fn derive(&self, password: &str) -> CryptoResult<PasswordRecord> {
        let salt = Self::new_salt()?;
        let digest = Self::hash(password, &salt, &self.params)?;
        Ok(PasswordRecord {
            digest,
            salt,
            params: self.params,
        })
    }

    /// Check `password` against `record` using the record's own parameters.
    pub fn verify(&self, password: &str, record: &PasswordRecord) -> bool {
        match Self::hash(password, &record.salt, &record.params) {
            Ok(digest) => constant_time_eq(digest.as_bytes(), record.digest.as_bytes()),
            Err(e) => {
                warn!(error = %e, "password verification could not recompute digest");
                false
            }
        }
    }
}

/// Compare two byte strings without short-circuiting on the first mismatch.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}
