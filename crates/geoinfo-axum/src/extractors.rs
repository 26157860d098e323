//! Axum extractors for authentication and authorization.
//!
//! These read the [`AuthContextExt`] inserted by [`crate::AuthLayer`]. The
//! layer has already enforced the path rules; extractors let a handler
//! state its own requirement on top of that.
//!
//! # Usage
//!
//! ```ignore
//! use geoinfo_axum::{MaybeAuth, RequireAdmin, RequireAuth};
//!
//! // Requires authentication (401 if not authenticated)
//! async fn me(auth: RequireAuth) -> String {
//!     auth.username.to_string()
//! }
//!
//! // Requires the ADMIN role (403 if missing)
//! async fn admin_only(auth: RequireAdmin) -> &'static str {
//!     "admin"
//! }
//!
//! // Optional authentication
//! async fn greeting(auth: MaybeAuth) -> String {
//!     match auth.0 {
//!         Some(identity) => format!("Hello, {}!", identity.username),
//!         None => "Hello, guest!".to_string(),
//!     }
//! }
//! ```

use std::marker::PhantomData;
use std::ops::Deref;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use geoinfo_auth_core::{AuthError, SecurityContext};
use geoinfo_types::{Identity, Role};

use crate::context::AuthContextExt;
use crate::error::AuthRejection;

fn security_context(parts: &Parts) -> SecurityContext {
    parts
        .extensions
        .get::<AuthContextExt>()
        .map(|ext| ext.0.clone())
        .unwrap_or(SecurityContext::Anonymous)
}

/// Extractor that requires a valid token.
///
/// Rejects with the token error (`TOKEN_EXPIRED`, `TOKEN_INVALID`, ...) when
/// one was presented, `UNAUTHENTICATED` otherwise.
#[derive(Debug, Clone)]
pub struct RequireAuth(pub Identity);

impl Deref for RequireAuth {
    type Target = Identity;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match security_context(parts) {
            SecurityContext::Authenticated(identity) => Ok(Self(identity)),
            other => Err(AuthRejection(other.unauthenticated_error())),
        }
    }
}

/// Extractor for optional authentication.
///
/// `None` for anonymous requests and for requests whose token failed
/// validation on a public path.
#[derive(Debug, Clone)]
pub struct MaybeAuth(pub Option<Identity>);

impl Deref for MaybeAuth {
    type Target = Option<Identity>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for MaybeAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(security_context(parts).identity().cloned()))
    }
}

/// Names the role a [`RequireRole`] extractor checks
pub trait RoleMarker: Send + Sync + 'static {
    const ROLE: Role;
}

#[derive(Debug, Clone, Copy)]
pub struct AdminRole;

impl RoleMarker for AdminRole {
    const ROLE: Role = Role::Admin;
}

#[derive(Debug, Clone, Copy)]
pub struct ProfessionnelRole;

impl RoleMarker for ProfessionnelRole {
    const ROLE: Role = Role::Professionnel;
}

/// Extractor that requires a specific role.
///
/// Returns 401 without a valid identity, 403 when the identity lacks the role.
#[derive(Debug, Clone)]
pub struct RequireRole<R: RoleMarker> {
    pub identity: Identity,
    role: PhantomData<R>,
}

impl<R: RoleMarker> RequireRole<R> {
    pub fn into_inner(self) -> Identity {
        self.identity
    }
}

impl<R: RoleMarker> Deref for RequireRole<R> {
    type Target = Identity;

    fn deref(&self) -> &Self::Target {
        &self.identity
    }
}

impl<S, R> FromRequestParts<S> for RequireRole<R>
where
    S: Send + Sync,
    R: RoleMarker,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequireAuth(identity) = RequireAuth::from_request_parts(parts, state).await?;

        if !identity.has_role(R::ROLE) {
            tracing::debug!(
                username = %identity.username,
                required = %R::ROLE,
                "Role check failed"
            );
            return Err(AuthRejection(AuthError::Forbidden { required: R::ROLE }));
        }

        Ok(Self {
            identity,
            role: PhantomData,
        })
    }
}

/// Requires the ADMIN role
pub type RequireAdmin = RequireRole<AdminRole>;

/// Requires the PROFESSIONNEL role
pub type RequireProfessionnel = RequireRole<ProfessionnelRole>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use geoinfo_types::Username;

    fn parts(ctx: Option<SecurityContext>) -> Parts {
        let mut req = Request::builder().uri("/api/auth/me").body(()).unwrap();
        if let Some(ctx) = ctx {
            req.extensions_mut().insert(AuthContextExt(ctx));
        }
        req.into_parts().0
    }

    fn identity(roles: &[Role]) -> Identity {
        Identity::new(
            Username::parse("agent@geoinfo.ma").unwrap(),
            roles.iter().copied(),
        )
    }

    #[tokio::test]
    async fn test_require_auth() {
        let mut p = parts(Some(SecurityContext::Authenticated(identity(&[]))));
        let auth = RequireAuth::from_request_parts(&mut p, &()).await.unwrap();
        assert_eq!(auth.username.as_str(), "agent@geoinfo.ma");

        let mut p = parts(None);
        let err = RequireAuth::from_request_parts(&mut p, &()).await.unwrap_err();
        assert_eq!(err.0, AuthError::Unauthenticated);

        let mut p = parts(Some(SecurityContext::Rejected(AuthError::TokenExpired)));
        let err = RequireAuth::from_request_parts(&mut p, &()).await.unwrap_err();
        assert_eq!(err.0, AuthError::TokenExpired);
    }

    #[tokio::test]
    async fn test_maybe_auth() {
        let mut p = parts(Some(SecurityContext::Rejected(AuthError::TokenInvalid)));
        let auth = MaybeAuth::from_request_parts(&mut p, &()).await.unwrap();
        assert!(auth.is_none());

        let mut p = parts(Some(SecurityContext::Authenticated(identity(&[Role::Citoyen]))));
        let auth = MaybeAuth::from_request_parts(&mut p, &()).await.unwrap();
        assert!(auth.is_some());
    }

    #[tokio::test]
    async fn test_require_role() {
        let mut p = parts(Some(SecurityContext::Authenticated(identity(&[Role::Admin]))));
        assert!(RequireAdmin::from_request_parts(&mut p, &()).await.is_ok());

        let mut p = parts(Some(SecurityContext::Authenticated(identity(&[Role::Admin]))));
        let err = RequireProfessionnel::from_request_parts(&mut p, &())
            .await
            .unwrap_err();
        assert_eq!(
            err.0,
            AuthError::Forbidden {
                required: Role::Professionnel
            }
        );

        let mut p = parts(None);
        let err = RequireAdmin::from_request_parts(&mut p, &()).await.unwrap_err();
        assert_eq!(err.0, AuthError::Unauthenticated);
    }
}
