//! Password hashing (Argon2id, PHC string digests).

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("password cannot be empty")]
    Empty,

    #[error("invalid hashing parameters: {0}")]
    Params(String),

    #[error("failed to hash password")]
    Hash,
}

/// Opaque `hash(secret) -> digest` / `verify(secret, digest) -> bool` collaborator.
pub trait PasswordService: Send + Sync {
    fn hash(&self, secret: &str) -> Result<String, PasswordError>;

    /// Never errors: a malformed digest simply does not verify.
    fn verify(&self, secret: &str, digest: &str) -> bool;
}

#[derive(Clone)]
pub struct Argon2PasswordService {
    hasher: Argon2<'static>,
}

impl Argon2PasswordService {
    /// Argon2id with explicit cost. `memory_kib` must be at least 8.
    pub fn with_cost(memory_kib: u32, iterations: u32) -> Result<Self, PasswordError> {
        let params = Params::new(memory_kib, iterations, Params::DEFAULT_P_COST, None)
            .map_err(|e| PasswordError::Params(e.to_string()))?;
        Ok(Self {
            hasher: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }
}

impl Default for Argon2PasswordService {
    fn default() -> Self {
        Self {
            hasher: Argon2::default(),
        }
    }
}

impl PasswordService for Argon2PasswordService {
    fn hash(&self, secret: &str) -> Result<String, PasswordError> {
        if secret.is_empty() {
            return Err(PasswordError::Empty);
        }
        let salt = SaltString::generate(&mut OsRng);
        self.hasher
            .hash_password(secret.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|_| PasswordError::Hash)
    }

    fn verify(&self, secret: &str, digest: &str) -> bool {
        // Cost parameters are read from the digest itself.
        match PasswordHash::new(digest) {
            Ok(parsed) => self
                .hasher
                .verify_password(secret.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }
}
