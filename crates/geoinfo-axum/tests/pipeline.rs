//! CORS and auth layers composed in gateway order

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use geoinfo_auth_core::{AuthorizationPolicy, CorsPolicy, TokenConfig, TokenService};
use geoinfo_axum::{AuthLayer, CorsLayer, RequireAdmin};
use geoinfo_types::{Identity, Role, Username};
use tower::ServiceExt;

const ORIGIN: &str = "https://geoinfo.netlify.app";

fn tokens() -> Arc<TokenService> {
    Arc::new(TokenService::new(
        TokenConfig::try_new("pipeline-test-secret-0123456789abcdef").unwrap(),
    ))
}

fn app(tokens: Arc<TokenService>) -> Router {
    async fn dashboard(admin: RequireAdmin) -> String {
        admin.username.to_string()
    }

    Router::new()
        .route("/api/admin/dashboard", get(dashboard))
        .route("/api/citoyens/incidents", post(|| async { StatusCode::CREATED }))
        .layer(AuthLayer::new(
            tokens,
            Arc::new(AuthorizationPolicy::incident_platform()),
        ))
        .layer(CorsLayer::new(Arc::new(CorsPolicy::incident_platform())))
}

fn bearer(tokens: &TokenService, role: Role) -> String {
    let identity = Identity::new(Username::parse("admin@geoinfo.ma").unwrap(), [role]);
    format!("Bearer {}", tokens.issue(&identity).unwrap().token)
}

#[tokio::test]
async fn preflight_on_protected_path_skips_authentication() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/admin/dashboard")
        .header(header::ORIGIN, ORIGIN)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization")
        .body(Body::empty())
        .unwrap();

    let response = app(tokens()).oneshot(request).await.unwrap();
    assert!(response.status().is_success());
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], ORIGIN);
}

#[tokio::test]
async fn denial_carries_cors_headers() {
    let request = Request::builder()
        .uri("/api/admin/dashboard")
        .header(header::ORIGIN, ORIGIN)
        .body(Body::empty())
        .unwrap();

    let response = app(tokens()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], ORIGIN);
}

#[tokio::test]
async fn role_gated_path_end_to_end() {
    let tokens = tokens();

    let request = Request::builder()
        .uri("/api/admin/dashboard")
        .header(header::AUTHORIZATION, bearer(&tokens, Role::Professionnel))
        .body(Body::empty())
        .unwrap();
    let response = app(tokens.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let request = Request::builder()
        .uri("/api/admin/dashboard")
        .header(header::AUTHORIZATION, bearer(&tokens, Role::Admin))
        .body(Body::empty())
        .unwrap();
    let response = app(tokens).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn anonymous_citizen_report_is_public() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/citoyens/incidents")
        .header(header::ORIGIN, "http://192.168.1.20:8100")
        .body(Body::empty())
        .unwrap();

    let response = app(tokens()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://192.168.1.20:8100"
    );
}
