//! Auth errors

use geoinfo_types::Role;
use thiserror::Error;

/// Authentication and authorization errors
///
/// Every denial maps to a distinct code so a client can tell "log in again"
/// apart from "you lack permission". None of these are retried server-side.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No usable identity on a protected path
    #[error("authentication required")]
    Unauthenticated,

    /// Identity is valid but lacks the role the path requires
    #[error("insufficient permissions: requires {required} role")]
    Forbidden { required: Role },

    /// Token is past its expiry
    #[error("token expired")]
    TokenExpired,

    /// Token signature, issuer or structure failed verification
    #[error("invalid token")]
    TokenInvalid,

    /// Authorization header present but not `Bearer <token>`
    #[error("malformed authorization header")]
    TokenMalformed,

    /// Unknown username or wrong password (never distinguished)
    #[error("invalid credentials")]
    CredentialMismatch,

    /// No authorization rule matched the request
    #[error("no authorization rule matches this request")]
    NoMatchingRule,

    /// Rejected request input (weak password, bad username, ...)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Username already provisioned
    #[error("username already exists")]
    UsernameTaken,

    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Unauthenticated
            | Self::TokenExpired
            | Self::TokenInvalid
            | Self::TokenMalformed
            | Self::CredentialMismatch => 401,
            Self::Forbidden { .. } | Self::NoMatchingRule => 403,
            Self::InvalidInput(_) => 400,
            Self::UsernameTaken => 409,
            Self::Database(_) | Self::Configuration(_) | Self::Internal(_) => 500,
        }
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::Forbidden { .. } => "FORBIDDEN",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::TokenInvalid => "TOKEN_INVALID",
            Self::TokenMalformed => "TOKEN_MALFORMED",
            Self::CredentialMismatch => "CREDENTIAL_MISMATCH",
            Self::NoMatchingRule => "NO_MATCHING_RULE",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::UsernameTaken => "USERNAME_TAKEN",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the error comes from a presented token
    pub fn is_token_error(&self) -> bool {
        matches!(
            self,
            Self::TokenExpired | Self::TokenInvalid | Self::TokenMalformed
        )
    }
}

impl From<geoinfo_db::DbError> for AuthError {
    fn from(err: geoinfo_db::DbError) -> Self {
        match err {
            geoinfo_db::DbError::Conflict(_) => Self::UsernameTaken,
            other => {
                tracing::error!("Database error: {}", other);
                Self::Database(other.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AuthError::Unauthenticated.status_code(), 401);
        assert_eq!(AuthError::TokenExpired.status_code(), 401);
        assert_eq!(
            AuthError::Forbidden {
                required: Role::Admin
            }
            .status_code(),
            403
        );
        assert_eq!(AuthError::Internal("boom".into()).status_code(), 500);
    }

    #[test]
    fn test_error_codes_are_distinct_for_denials() {
        let codes = [
            AuthError::Unauthenticated.error_code(),
            AuthError::Forbidden {
                required: Role::Admin,
            }
            .error_code(),
            AuthError::TokenExpired.error_code(),
            AuthError::TokenInvalid.error_code(),
            AuthError::TokenMalformed.error_code(),
            AuthError::CredentialMismatch.error_code(),
        ];
        let unique: std::collections::HashSet<_> = codes.iter().collect();
        assert_eq!(unique.len(), codes.len());
    }

    #[test]
    fn test_forbidden_display_names_role() {
        let err = AuthError::Forbidden {
            required: Role::Professionnel,
        };
        assert_eq!(
            err.to_string(),
            "insufficient permissions: requires PROFESSIONNEL role"
        );
    }

    #[test]
    fn test_db_conflict_maps_to_username_taken() {
        let err: AuthError = geoinfo_db::DbError::Conflict("a@b.c".into()).into();
        assert_eq!(err, AuthError::UsernameTaken);
    }
}
