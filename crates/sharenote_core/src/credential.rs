//! Credential hashing capability.
//!
//! # Responsibility
//! - Define the opaque `hash`/`verify` boundary the user directory consumes.
//! - Provide an Argon2id implementation producing PHC-format strings.
//!
//! # Invariants
//! - Raw credentials and hash strings never appear in errors or logs.
//! - `verify` treats a malformed stored hash as a failed match.
//! - `decoy_hash` matches the cost of real hashes, so a lookup miss can be
//!   verified at the same price as a wrong credential.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use log::warn;
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Hashing capability failure. Carries no secret material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashError {
    reason: String,
}

impl HashError {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Display for HashError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "credential hashing failed: {}", self.reason)
    }
}

impl Error for HashError {}

/// Fixed input hashed into the decoy; never a usable credential.
const DECOY_CREDENTIAL: &str = "sharenote-decoy-credential";

/// Opaque one-way credential hashing.
pub trait CredentialHasher {
    fn hash(&self, raw: &str) -> Result<String, HashError>;
    fn verify(&self, raw: &str, hash: &str) -> bool;
    /// Hash that no real account owns, verified when a username is unknown.
    fn decoy_hash(&self) -> Result<&str, HashError>;
}

impl<H: CredentialHasher + ?Sized> CredentialHasher for &H {
    fn hash(&self, raw: &str) -> Result<String, HashError> {
        (**self).hash(raw)
    }

    fn verify(&self, raw: &str, hash: &str) -> bool {
        (**self).verify(raw, hash)
    }

    fn decoy_hash(&self) -> Result<&str, HashError> {
        (**self).decoy_hash()
    }
}

/// Argon2id hasher with a random per-credential salt.
#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    params: Params,
    decoy: OnceCell<String>,
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self {
            params: Params::default(),
            decoy: OnceCell::new(),
        }
    }
}

impl Argon2Hasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a hasher with explicit memory (KiB), iteration and lane costs.
    pub fn with_params(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self, HashError> {
        let params = Params::new(m_cost, t_cost, p_cost, None)
            .map_err(|err| HashError::new(format!("invalid argon2 parameters: {err}")))?;
        Ok(Self {
            params,
            decoy: OnceCell::new(),
        })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, raw: &str) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(raw.as_bytes(), &salt)
            .map_err(|err| HashError::new(err.to_string()))?;
        Ok(hash.to_string())
    }

    fn verify(&self, raw: &str, hash: &str) -> bool {
        let parsed = match PasswordHash::new(hash) {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!("event=credential_verify module=credential status=error error_code=malformed_hash");
                return false;
            }
        };
        self.argon2()
            .verify_password(raw.as_bytes(), &parsed)
            .is_ok()
    }

    /// Hashed once per hasher with its own parameters, then reused.
    fn decoy_hash(&self) -> Result<&str, HashError> {
        self.decoy
            .get_or_try_init(|| self.hash(DECOY_CREDENTIAL))
            .map(String::as_str)
    }
}
