//! Configuration types for the auth gateway

use std::time::Duration;

use crate::AuthError;

/// Token signing configuration
#[derive(Clone)]
pub struct TokenConfig {
    /// HMAC secret used to sign and verify tokens
    pub secret: String,
    /// Lifetime of an issued token
    pub ttl: Duration,
    /// Issuer claim written into and required on every token
    pub issuer: String,
    /// Clock skew tolerated when checking expiry (none by default)
    pub leeway: Duration,
}

impl TokenConfig {
    /// Minimum secret length in bytes (256 bits)
    pub const MIN_SECRET_LENGTH: usize = 32;

    /// Create a token config, rejecting secrets shorter than 32 bytes
    pub fn try_new(secret: impl Into<String>) -> Result<Self, AuthError> {
        let secret = secret.into();
        if secret.len() < Self::MIN_SECRET_LENGTH {
            return Err(AuthError::Configuration(format!(
                "token secret too short: got {} bytes, need at least {}",
                secret.len(),
                Self::MIN_SECRET_LENGTH
            )));
        }
        Ok(Self {
            secret,
            ttl: Duration::from_secs(24 * 60 * 60), // 24 hours
            issuer: "geoinfo".to_string(),
            leeway: Duration::ZERO,
        })
    }

    /// Set token lifetime
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the issuer claim
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    /// Set expiry leeway
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret_length", &self.secret.len())
            .field("ttl", &self.ttl)
            .field("issuer", &self.issuer)
            .field("leeway", &self.leeway)
            .finish()
    }
}

/// Password hashing cost parameters (Argon2id)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordConfig {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

impl PasswordConfig {
    pub fn new(memory_kib: u32, iterations: u32, parallelism: u32) -> Self {
        Self {
            memory_kib,
            iterations,
            parallelism,
        }
    }
}

/// Auth core configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub token: TokenConfig,
    pub password: PasswordConfig,
}

impl AuthConfig {
    /// Create a config with default password cost
    pub fn new(token: TokenConfig) -> Self {
        Self {
            token,
            password: PasswordConfig::default(),
        }
    }

    /// Set password hashing cost
    pub fn with_password(mut self, password: PasswordConfig) -> Self {
        self.password = password;
        self
    }
}
