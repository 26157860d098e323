//! Application state

use std::sync::Arc;

use geoinfo_auth_core::{AuthService, AuthorizationPolicy, CorsPolicy, TokenService};
use geoinfo_db::{CredentialRepository, DbPool};

use crate::config::Config;

/// Auth service over whichever credential store was configured
pub type AuthServiceImpl = AuthService<dyn CredentialRepository>;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Login, password change and token validation
    pub auth: Arc<AuthServiceImpl>,
    /// Database pool, when backed by PostgreSQL (for health checks)
    pub pool: Option<DbPool>,
    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Create new application state
    pub fn new(auth: AuthServiceImpl, pool: Option<DbPool>, config: Config) -> Self {
        Self {
            auth: Arc::new(auth),
            pool,
            config: Arc::new(config),
        }
    }

    pub fn tokens(&self) -> Arc<TokenService> {
        self.auth.tokens()
    }

    pub fn policy(&self) -> Arc<AuthorizationPolicy> {
        Arc::clone(&self.config.policy)
    }

    pub fn cors(&self) -> Arc<CorsPolicy> {
        Arc::clone(&self.config.cors)
    }

    /// Get request timeout from config
    pub fn request_timeout(&self) -> std::time::Duration {
        self.config.request_timeout
    }
}
