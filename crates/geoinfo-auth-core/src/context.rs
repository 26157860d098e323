//! Per-request security context

use geoinfo_types::{Identity, Role};

use crate::AuthError;

/// Outcome of authenticating one request.
///
/// Produced once per request by [`crate::TokenService::authenticate`] and
/// consumed by the authorization policy. A token that failed validation does
/// not reject the request by itself: public paths stay reachable and
/// protected paths report the specific token error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecurityContext {
    /// No credentials were presented
    Anonymous,
    /// A valid token resolved to this identity
    Authenticated(Identity),
    /// Credentials were presented but failed validation
    Rejected(AuthError),
}

impl SecurityContext {
    /// Bound identity, if any
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    /// Check whether the bound identity holds a role
    pub fn has_role(&self, role: Role) -> bool {
        self.identity().is_some_and(|identity| identity.has_role(role))
    }

    /// Error to report when this context reaches a protected path
    pub fn unauthenticated_error(&self) -> AuthError {
        match self {
            Self::Rejected(err) => err.clone(),
            _ => AuthError::Unauthenticated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoinfo_types::Username;

    #[test]
    fn test_context_accessors() {
        let identity = Identity::new(Username::parse("a@geoinfo.ma").unwrap(), [Role::Admin]);
        let ctx = SecurityContext::Authenticated(identity.clone());
        assert_eq!(ctx.identity(), Some(&identity));
        assert!(ctx.has_role(Role::Admin));
        assert!(!ctx.has_role(Role::Professionnel));

        assert!(!SecurityContext::Anonymous.is_authenticated());
        assert!(!SecurityContext::Anonymous.has_role(Role::Admin));
    }

    #[test]
    fn test_unauthenticated_error_keeps_token_cause() {
        assert_eq!(
            SecurityContext::Anonymous.unauthenticated_error(),
            AuthError::Unauthenticated
        );
        assert_eq!(
            SecurityContext::Rejected(AuthError::TokenExpired).unauthenticated_error(),
            AuthError::TokenExpired
        );
    }
}
