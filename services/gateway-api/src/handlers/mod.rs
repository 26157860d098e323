//! HTTP handlers

mod auth;
mod health;

pub use auth::{change_password, login, me};
pub use health::health;

use axum::http::Uri;

use crate::error::ApiError;

/// Routes this gateway does not serve itself. Authorization has already
/// run by the time a request lands here.
pub async fn not_found(uri: Uri) -> ApiError {
    tracing::debug!(path = uri.path(), "No route");
    ApiError::NotFound
}
