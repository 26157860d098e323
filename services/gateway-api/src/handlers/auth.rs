//! Authentication handlers (login, me, password change)

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use geoinfo_auth_core::AuthError;
use geoinfo_axum::RequireAuth;
use geoinfo_types::{Identity, Role};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Accepts both the API field names and the web client's
/// (`email` / `motDePasse`).
#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "email")]
    pub username: String,
    #[serde(alias = "motDePasse")]
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(rename = "type")]
    pub token_type: &'static str,
    pub expires_at: String,
    pub utilisateur: UserInfo,
}

#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub username: String,
    /// Highest role held, what the web client routes on
    pub role: Option<Role>,
    pub roles: Vec<Role>,
}

impl From<&Identity> for UserInfo {
    fn from(identity: &Identity) -> Self {
        Self {
            username: identity.username.to_string(),
            role: identity.primary_role(),
            roles: identity.roles.iter().copied().collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub utilisateur: UserInfo,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(alias = "ancienMotDePasse")]
    pub current_password: String,
    #[serde(alias = "nouveauMotDePasse")]
    pub new_password: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/auth/login
///
/// Verify credentials and issue a bearer token
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    let Json(req) = payload?;
    if req.username.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest(
            "username and password are required".to_string(),
        ));
    }

    let outcome = match state.auth.login(&req.username, &req.password).await {
        Ok(outcome) => outcome,
        Err(err) => {
            let outcome = if err == AuthError::CredentialMismatch {
                "rejected"
            } else {
                "error"
            };
            metrics::counter!("gateway_logins_total", "outcome" => outcome).increment(1);
            return Err(err.into());
        }
    };
    metrics::counter!("gateway_logins_total", "outcome" => "success").increment(1);

    Ok(Json(LoginResponse {
        token: outcome.token.token,
        token_type: "Bearer",
        expires_at: outcome.token.expires_at.to_rfc3339(),
        utilisateur: UserInfo::from(&outcome.identity),
    }))
}

/// GET /api/auth/me
///
/// Identity carried by the presented token
pub async fn me(RequireAuth(identity): RequireAuth) -> Json<MeResponse> {
    Json(MeResponse {
        utilisateur: UserInfo::from(&identity),
    })
}

/// POST /api/auth/password
///
/// Change the caller's password; the current one must be re-entered
pub async fn change_password(
    RequireAuth(identity): RequireAuth,
    State(state): State<AppState>,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(req) = payload?;
    state
        .auth
        .change_password(&identity.username, &req.current_password, &req.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
