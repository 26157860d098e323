//! Password hashing and verification
//!
//! Passwords are stored as Argon2id PHC strings. Each hash embeds its own
//! random salt and cost parameters, so raising the configured cost only
//! affects newly written hashes. Digest comparison inside
//! `PasswordVerifier` is constant time.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use std::sync::Arc;

use crate::{AuthError, PasswordConfig};

/// Minimum accepted plaintext length for new passwords
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Argon2id password hasher with a fixed cost factor.
///
/// Cheap to clone; hashing is CPU bound and should run off the async
/// executor (see [`PasswordHasher::verify_blocking`]).
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
    /// Hash verified for unknown usernames so lookups take comparable time
    dummy_hash: Arc<str>,
}

impl PasswordHasher {
    /// Create a hasher with the given cost parameters
    pub fn new(config: PasswordConfig) -> Result<Self, AuthError> {
        let params = Params::new(
            config.memory_kib,
            config.iterations,
            config.parallelism,
            None,
        )
        .map_err(|e| AuthError::Configuration(format!("invalid password cost: {e}")))?;

        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let salt = SaltString::generate(&mut OsRng);
        let dummy_hash = argon2
            .hash_password(b"geoinfo-unknown-user", &salt)
            .map_err(|e| AuthError::Internal(format!("failed to derive dummy hash: {e}")))?
            .to_string();

        Ok(Self {
            argon2,
            dummy_hash: Arc::from(dummy_hash),
        })
    }

    /// Hash a plaintext password into a PHC string with a fresh salt
    pub fn hash(&self, plaintext: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Internal(format!("password hashing failed: {e}")))
    }

    /// Check a plaintext password against a stored hash.
    ///
    /// A stored value that is not a valid PHC string never matches.
    pub fn verify(&self, plaintext: &str, stored_hash: &str) -> bool {
        let parsed = match PasswordHash::new(stored_hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, "Stored password hash is not a valid PHC string");
                return false;
            }
        };
        self.argon2
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }

    /// Burn one verification against the dummy hash.
    ///
    /// Used when the username is unknown so the response time does not
    /// reveal whether an account exists.
    pub fn verify_dummy(&self, plaintext: &str) {
        let _ = self.verify(plaintext, &self.dummy_hash);
    }

    /// Run [`PasswordHasher::verify`] on the blocking pool.
    ///
    /// `stored_hash` of `None` verifies against the dummy hash and returns false.
    pub async fn verify_blocking(
        &self,
        plaintext: String,
        stored_hash: Option<String>,
    ) -> Result<bool, AuthError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || match stored_hash {
            Some(hash) => hasher.verify(&plaintext, &hash),
            None => {
                hasher.verify_dummy(&plaintext);
                false
            }
        })
        .await
        .map_err(|e| AuthError::Internal(format!("password verification task failed: {e}")))
    }

    /// Run [`PasswordHasher::hash`] on the blocking pool
    pub async fn hash_blocking(&self, plaintext: String) -> Result<String, AuthError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .map_err(|e| AuthError::Internal(format!("password hashing task failed: {e}")))?
    }
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let params = self.argon2.params();
        f.debug_struct("PasswordHasher")
            .field("memory_kib", &params.m_cost())
            .field("iterations", &params.t_cost())
            .field("parallelism", &params.p_cost())
            .finish_non_exhaustive()
    }
}

/// Validate a new plaintext password before hashing
pub fn check_password_strength(plaintext: &str) -> Result<(), AuthError> {
    if plaintext.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::InvalidInput(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}
