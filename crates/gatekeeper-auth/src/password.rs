//! Password hashing and verification (Argon2id)

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Plaintext hashed once at startup to produce the timing decoy
const DECOY_PLAINTEXT: &str = "gatekeeper-timing-decoy";

/// Argon2 cost parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WorkFactor {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for WorkFactor {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

/// Hashes and verifies passwords with a fixed work factor
#[derive(Clone)]
pub struct PasswordManager {
    argon2: Argon2<'static>,
    decoy_hash: String,
}

impl PasswordManager {
    /// Create a manager, rejecting work factors Argon2 cannot use
    pub fn new(work_factor: WorkFactor) -> Result<Self, AuthError> {
        let params = Params::new(
            work_factor.memory_kib,
            work_factor.iterations,
            work_factor.parallelism,
            None,
        )
        .map_err(|e| AuthError::Configuration(format!("invalid Argon2 work factor: {}", e)))?;

        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let mut manager = Self {
            argon2,
            decoy_hash: String::new(),
        };
        manager.decoy_hash = manager.hash(DECOY_PLAINTEXT)?;
        Ok(manager)
    }

    /// Hash a password into a PHC string with a fresh random salt
    pub fn hash(&self, plain: &str) -> Result<String, AuthError> {
        if plain.is_empty() {
            return Err(AuthError::InvalidInput("password must not be empty".to_string()));
        }

        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| AuthError::Internal(format!("password hashing failed: {}", e)))?;
        Ok(hash.to_string())
    }

    /// Verify a password against a stored PHC hash
    ///
    /// The parameters embedded in the stored hash are used, so hashes made
    /// under an older work factor keep verifying.
    pub fn verify(&self, plain: &str, hash: &str) -> Result<bool, AuthError> {
        if plain.is_empty() {
            return Err(AuthError::InvalidInput("password must not be empty".to_string()));
        }
        if hash.is_empty() {
            return Err(AuthError::InvalidInput("password hash must not be empty".to_string()));
        }

        let parsed = PasswordHash::new(hash)
            .map_err(|e| AuthError::Internal(format!("stored password hash is unreadable: {}", e)))?;

        match self.argon2.verify_password(plain.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::Internal(format!(
                "password verification failed: {}",
                e
            ))),
        }
    }

    /// Spend the same effort as a real verification, for unknown accounts
    pub fn verify_decoy(&self, plain: &str) {
        let _ = self.verify(plain, &self.decoy_hash);
    }
}
