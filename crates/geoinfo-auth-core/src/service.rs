//! Auth service - ties together credential verification, token issuance
//! and request authentication

use geoinfo_db::{CreateCredential, CredentialRepository, CredentialRow};
use geoinfo_types::{Identity, Role, Username};
use std::sync::Arc;

use crate::{
    config::AuthConfig,
    password::{check_password_strength, PasswordHasher},
    token::{IssuedToken, TokenService},
    AuthError, SecurityContext,
};

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub identity: Identity,
    pub token: IssuedToken,
}

/// Authentication service
///
/// Provides unified interface for:
/// - Login (credential verification + token issuance)
/// - Request authentication from a bearer header
/// - Account provisioning and password change
pub struct AuthService<R: CredentialRepository + ?Sized> {
    tokens: Arc<TokenService>,
    hasher: PasswordHasher,
    credentials: Arc<R>,
}

impl<R: CredentialRepository + ?Sized> AuthService<R> {
    /// Create a new auth service
    pub fn new(config: AuthConfig, credentials: Arc<R>) -> Result<Self, AuthError> {
        Ok(Self {
            tokens: Arc::new(TokenService::new(config.token)),
            hasher: PasswordHasher::new(config.password)?,
            credentials,
        })
    }

    /// Shared token service, for the request pipeline
    pub fn tokens(&self) -> Arc<TokenService> {
        Arc::clone(&self.tokens)
    }

    // =========================================================================
    // Login
    // =========================================================================

    /// Verify a username/password pair and issue a token.
    ///
    /// Unknown usernames and wrong passwords both yield
    /// [`AuthError::CredentialMismatch`] after a full hash computation.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let row = match Username::parse(username) {
            Ok(username) => self.credentials.find_by_username(username.as_str()).await?,
            Err(_) => None,
        };

        let matched = self
            .hasher
            .verify_blocking(
                password.to_string(),
                row.as_ref().map(|r| r.password_hash.clone()),
            )
            .await?;

        let row = match row {
            Some(row) if matched => row,
            _ => {
                tracing::debug!("Login rejected");
                return Err(AuthError::CredentialMismatch);
            }
        };

        let identity = identity_from_row(&row)?;
        let token = self.tokens.issue(&identity)?;

        tracing::info!(
            username = %identity.username,
            roles = ?identity.roles,
            expires_at = %token.expires_at,
            "Login succeeded"
        );

        Ok(LoginOutcome { identity, token })
    }

    // =========================================================================
    // Request Authentication
    // =========================================================================

    /// Resolve a request's security context from its `Authorization` header
    pub fn authenticate(&self, authorization: Option<&str>) -> SecurityContext {
        self.tokens.authenticate(authorization)
    }

    // =========================================================================
    // Account Management
    // =========================================================================

    /// Provision a new account
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        roles: impl IntoIterator<Item = Role>,
    ) -> Result<Identity, AuthError> {
        let username =
            Username::parse(username).map_err(|e| AuthError::InvalidInput(e.to_string()))?;
        check_password_strength(password)?;

        let password_hash = self.hasher.hash_blocking(password.to_string()).await?;
        let identity = Identity::new(username, roles);

        self.credentials
            .create(CreateCredential {
                id: uuid::Uuid::new_v4(),
                username: identity.username.to_string(),
                password_hash,
                roles: identity.roles.iter().map(|r| r.as_str().to_string()).collect(),
            })
            .await?;

        tracing::info!(username = %identity.username, roles = ?identity.roles, "Account provisioned");
        Ok(identity)
    }

    /// Replace a password after re-verifying the current one.
    ///
    /// Tokens issued before the change stay valid until they expire.
    pub async fn change_password(
        &self,
        username: &Username,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        check_password_strength(new_password)?;

        let row = self.credentials.find_by_username(username.as_str()).await?;
        let matched = self
            .hasher
            .verify_blocking(
                current_password.to_string(),
                row.as_ref().map(|r| r.password_hash.clone()),
            )
            .await?;
        if row.is_none() || !matched {
            return Err(AuthError::CredentialMismatch);
        }

        let password_hash = self.hasher.hash_blocking(new_password.to_string()).await?;
        self.credentials
            .update_password_hash(username.as_str(), &password_hash)
            .await?;

        tracing::info!(username = %username, "Password changed");
        Ok(())
    }

    /// Look up the identity stored for a username
    pub async fn find_identity(&self, username: &str) -> Result<Option<Identity>, AuthError> {
        self.credentials
            .find_by_username(username)
            .await?
            .map(|row| identity_from_row(&row))
            .transpose()
    }
}

/// Build an identity from a stored row.
///
/// Unknown role labels are dropped, which can only lower privilege.
fn identity_from_row(row: &CredentialRow) -> Result<Identity, AuthError> {
    let username = Username::parse(&row.username)
        .map_err(|_| AuthError::Internal("stored credential has empty username".to_string()))?;

    let roles = row.roles.iter().filter_map(|label| match label.parse::<Role>() {
        Ok(role) => Some(role),
        Err(e) => {
            tracing::warn!(username = %username, error = %e, "Ignoring unknown stored role");
            None
        }
    });

    Ok(Identity::new(username.clone(), roles.collect::<Vec<_>>()))
}

impl<R: CredentialRepository + ?Sized> std::fmt::Debug for AuthService<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("tokens", &self.tokens)
            .field("hasher", &self.hasher)
            .finish()
    }
}
