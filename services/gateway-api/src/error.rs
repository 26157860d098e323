//! Error types for the gateway service.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use geoinfo_auth_core::AuthError;
use geoinfo_axum::error::{ErrorBody, ErrorDetail};
use geoinfo_axum::AuthRejection;

/// API error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Resource not found")]
    NotFound,

    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Auth(e) => {
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::NotFound => "NOT_FOUND",
            Self::Auth(e) => e.error_code(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Auth errors share the gateway's rejection format
        if let Self::Auth(err) = self {
            return AuthRejection(err).into_response();
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: self.error_code(),
                message: self.to_string(),
            },
        };

        (self.status_code(), Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::BadRequest("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Auth(AuthError::CredentialMismatch).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Auth(AuthError::UsernameTaken).error_code(),
            "USERNAME_TAKEN"
        );
    }

    #[test]
    fn test_auth_error_response() {
        let response = ApiError::from(AuthError::CredentialMismatch).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
