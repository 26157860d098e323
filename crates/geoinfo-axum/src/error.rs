//! Error responses for auth middleware and extractors.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use geoinfo_auth_core::AuthError;
use serde::Serialize;

/// Error body shared by every gateway rejection
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// Auth rejection, rendered as `{ "error": { "code", "message" } }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRejection(pub AuthError);

impl AuthRejection {
    pub fn error(&self) -> &AuthError {
        &self.0
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl From<AuthError> for AuthRejection {
    fn from(err: AuthError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let status = self.status();

        // Internal details stay in the logs
        let message = if status.is_server_error() {
            tracing::error!(error = %self.0, "Internal auth error");
            "internal error".to_string()
        } else {
            self.0.to_string()
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: self.0.error_code(),
                message,
            },
        };

        let mut response = (status, Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoinfo_types::Role;
    use http_body_util::BodyExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_unauthenticated_response() {
        let response = AuthRejection(AuthError::TokenExpired).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "TOKEN_EXPIRED");
        assert_eq!(body["error"]["message"], "token expired");
    }

    #[tokio::test]
    async fn test_forbidden_response() {
        let response = AuthRejection(AuthError::Forbidden {
            required: Role::Admin,
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn test_internal_message_is_masked() {
        let response = AuthRejection(AuthError::Database("connection refused".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"]["message"], "internal error");
    }
}
