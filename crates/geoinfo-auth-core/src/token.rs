//! Token issuance and validation
//!
//! Tokens are HS256 JWTs carrying subject, roles, issued-at, expiry and
//! issuer. Validation never touches the credential store: the identity is
//! rebuilt from the claims alone. There is no revocation list; a token
//! stays valid until it expires.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use geoinfo_types::{Identity, Role, Username};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{AuthError, SecurityContext, TokenConfig};

/// Scheme prefix expected in the `Authorization` header
pub const BEARER_PREFIX: &str = "Bearer ";

/// Claims embedded in an issued token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (username)
    pub sub: String,
    /// Role labels held by the subject
    #[serde(default)]
    pub roles: Vec<Role>,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
    /// Issuer
    pub iss: String,
}

/// A freshly minted token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Issues and validates signed tokens.
///
/// The keys are derived once at construction and only read afterwards, so a
/// single instance can be shared across all request handlers.
#[derive(Clone)]
pub struct TokenService {
    config: TokenConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenService {
    /// Create a token service from its configuration
    pub fn new(config: TokenConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);
        validation.leeway = config.leeway.as_secs();
        validation.validate_aud = false;

        Self {
            config,
            encoding_key,
            decoding_key,
            validation,
        }
    }

    /// Token lifetime
    pub fn ttl(&self) -> std::time::Duration {
        self.config.ttl
    }

    /// Issue a token for a verified identity, valid from now
    pub fn issue(&self, identity: &Identity) -> Result<IssuedToken, AuthError> {
        self.issue_at(identity, Utc::now())
    }

    /// Issue a token as if it had been minted at `issued_at`
    pub fn issue_at(
        &self,
        identity: &Identity,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedToken, AuthError> {
        let ttl = ChronoDuration::from_std(self.config.ttl)
            .map_err(|_| AuthError::Configuration("token ttl out of range".to_string()))?;
        let expires_at = issued_at + ttl;

        let claims = Claims {
            sub: identity.username.to_string(),
            roles: identity.roles.iter().copied().collect(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            iss: self.config.issuer.clone(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| {
                tracing::error!("Failed to sign token: {}", e);
                AuthError::Internal("failed to sign token".to_string())
            })?;

        Ok(IssuedToken {
            token,
            issued_at,
            expires_at,
        })
    }

    /// Verify a token and rebuild the identity it carries
    pub fn validate(&self, token: &str) -> Result<Identity, AuthError> {
        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                tracing::debug!("Token validation failed: {}", e);
                match e.kind() {
                    ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                    _ => AuthError::TokenInvalid,
                }
            })?;

        let claims = token_data.claims;
        let username = Username::parse(&claims.sub).map_err(|_| {
            tracing::debug!("Token subject is empty");
            AuthError::TokenInvalid
        })?;

        Ok(Identity::new(username, claims.roles))
    }

    /// Resolve the security context of a request from its `Authorization`
    /// header value.
    pub fn authenticate(&self, authorization: Option<&str>) -> SecurityContext {
        let token = match extract_bearer(authorization) {
            Ok(Some(token)) => token,
            Ok(None) => return SecurityContext::Anonymous,
            Err(err) => return SecurityContext::Rejected(err),
        };

        match self.validate(token) {
            Ok(identity) => SecurityContext::Authenticated(identity),
            Err(err) => SecurityContext::Rejected(err),
        }
    }
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Extract the bearer token from an `Authorization` header value.
///
/// Absence is not an error. A header that is present but is not
/// `Bearer <token>` with a non-empty token is [`AuthError::TokenMalformed`].
pub fn extract_bearer(authorization: Option<&str>) -> Result<Option<&str>, AuthError> {
    let Some(value) = authorization else {
        return Ok(None);
    };

    let token = value
        .get(..BEARER_PREFIX.len())
        .filter(|scheme| scheme.eq_ignore_ascii_case(BEARER_PREFIX))
        .map(|_| value[BEARER_PREFIX.len()..].trim())
        .ok_or(AuthError::TokenMalformed)?;

    if token.is_empty() || token.contains(char::is_whitespace) {
        return Err(AuthError::TokenMalformed);
    }

    Ok(Some(token))
}
