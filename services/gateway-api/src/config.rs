//! Configuration for the gateway service.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use geoinfo_auth_core::{
    AuthConfig, AuthorizationPolicy, CorsPolicy, CorsRuleSpec, PasswordConfig, RuleSpec,
    TokenConfig,
};
use serde::Deserialize;

/// Account created at startup when the store does not have it yet
#[derive(Clone)]
pub struct BootstrapAdmin {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Gateway configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub http_port: u16,

    /// Database URL; the in-memory store is used when absent
    pub database_url: Option<String>,

    /// Auth core configuration
    pub auth: AuthConfig,

    /// Request timeout
    pub request_timeout: Duration,

    /// Apply embedded schema migrations at startup (Postgres only)
    pub run_migrations: bool,

    /// Metrics enabled
    pub metrics_enabled: bool,

    pub bootstrap_admin: Option<BootstrapAdmin>,

    /// Ordered authorization rules
    pub policy: Arc<AuthorizationPolicy>,

    /// CORS rules
    pub cors: Arc<CorsPolicy>,
}

/// Policy file layout
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PolicyFile {
    auth: Option<AuthSection>,
    cors: Option<Vec<CorsRuleSpec>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AuthSection {
    rules: Vec<RuleSpec>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from environment variables, then apply the policy
    /// file named by `GATEWAY_POLICY_FILE` if set
    pub fn from_env_or_yaml() -> Result<Self, ConfigError> {
        let mut config = Self::from_env()?;
        if let Ok(path) = std::env::var("GATEWAY_POLICY_FILE") {
            let contents = fs::read_to_string(&path).map_err(|e| ConfigError::PolicyFile {
                path: path.clone(),
                reason: e.to_string(),
            })?;
            config.apply_policy_yaml(&contents).map_err(|e| match e {
                ConfigError::Policy(reason) => ConfigError::PolicyFile { path, reason },
                other => other,
            })?;
        }
        Ok(config)
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        let http_port = lookup("HTTP_PORT")
            .unwrap_or_else(|| "8080".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("HTTP_PORT"))?;

        // Token signing secret (minimum 32 bytes)
        let token_secret = lookup("TOKEN_SECRET").ok_or(ConfigError::Missing("TOKEN_SECRET"))?;

        // Token lifetime (default 24 hours)
        let token_ttl_hours: u64 = lookup("TOKEN_TTL_HOURS")
            .unwrap_or_else(|| "24".to_string())
            .parse()
            .ok()
            .filter(|hours| *hours > 0)
            .ok_or(ConfigError::Invalid("TOKEN_TTL_HOURS"))?;

        // Clock skew tolerated past expiry (default none)
        let token_leeway_secs: u64 = lookup("TOKEN_LEEWAY_SECS")
            .unwrap_or_else(|| "0".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("TOKEN_LEEWAY_SECS"))?;

        // Request timeout (default 30 seconds)
        let request_timeout_secs: u64 = lookup("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|| "30".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("REQUEST_TIMEOUT_SECS"))?;

        let run_migrations = match lookup("DATABASE_RUN_MIGRATIONS") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::Invalid("DATABASE_RUN_MIGRATIONS"))?,
            None => true,
        };

        let metrics_enabled = lookup("METRICS_ENABLED")
            .unwrap_or_else(|| "true".to_string())
            .parse()
            .unwrap_or(true);

        // Password hashing cost
        let defaults = PasswordConfig::default();
        let memory_kib = match lookup("PASSWORD_MEMORY_KIB") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::Invalid("PASSWORD_MEMORY_KIB"))?,
            None => defaults.memory_kib,
        };
        let iterations = match lookup("PASSWORD_ITERATIONS") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::Invalid("PASSWORD_ITERATIONS"))?,
            None => defaults.iterations,
        };

        let bootstrap_admin = match (
            lookup("BOOTSTRAP_ADMIN_USERNAME"),
            lookup("BOOTSTRAP_ADMIN_PASSWORD"),
        ) {
            (Some(username), Some(password)) => Some(BootstrapAdmin { username, password }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing("BOOTSTRAP_ADMIN_PASSWORD")),
            (None, Some(_)) => return Err(ConfigError::Missing("BOOTSTRAP_ADMIN_USERNAME")),
        };

        let mut token = TokenConfig::try_new(token_secret)
            .map_err(|e| ConfigError::AuthConfig(e.to_string()))?
            .with_ttl(Duration::from_secs(token_ttl_hours * 3600))
            .with_leeway(Duration::from_secs(token_leeway_secs));
        if let Some(issuer) = lookup("TOKEN_ISSUER") {
            token = token.with_issuer(issuer);
        }

        let auth = AuthConfig::new(token).with_password(PasswordConfig::new(
            memory_kib,
            iterations,
            defaults.parallelism,
        ));

        Ok(Self {
            http_port,
            database_url,
            auth,
            request_timeout: Duration::from_secs(request_timeout_secs),
            run_migrations,
            metrics_enabled,
            bootstrap_admin,
            policy: Arc::new(AuthorizationPolicy::incident_platform()),
            cors: Arc::new(CorsPolicy::incident_platform()),
        })
    }

    /// Replace the built-in rules with those of a policy file.
    ///
    /// Sections left out of the file keep their current rules.
    pub fn apply_policy_yaml(&mut self, contents: &str) -> Result<(), ConfigError> {
        let file: PolicyFile =
            serde_yaml::from_str(contents).map_err(|e| ConfigError::Policy(e.to_string()))?;

        if let Some(auth) = file.auth {
            let policy = AuthorizationPolicy::from_specs(auth.rules)
                .map_err(|e| ConfigError::Policy(e.to_string()))?;
            self.policy = Arc::new(policy);
        }
        if let Some(cors) = file.cors {
            let cors = CorsPolicy::from_specs(cors).map_err(|e| ConfigError::Policy(e.to_string()))?;
            self.cors = Arc::new(cors);
        }
        Ok(())
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Auth config error: {0}")]
    AuthConfig(String),

    #[error("Invalid policy: {0}")]
    Policy(String),

    #[error("Policy file {path}: {reason}")]
    PolicyFile { path: String, reason: String },
}
