//! Request extension carrying the resolved security context

use geoinfo_auth_core::SecurityContext;
use geoinfo_types::Identity;

/// Extension key for the security context in request extensions.
///
/// Inserted by [`crate::AuthLayer`] on every request it lets through,
/// including public requests that carried a stale token.
#[derive(Debug, Clone)]
pub struct AuthContextExt(pub SecurityContext);

impl AuthContextExt {
    pub fn identity(&self) -> Option<&Identity> {
        self.0.identity()
    }
}
