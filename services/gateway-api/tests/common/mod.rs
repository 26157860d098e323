use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::Router;
use gateway_api::app::build_router;
use gateway_api::config::Config;
use gateway_api::state::AppState;
use geoinfo_auth_core::{AuthService, PasswordConfig};
use geoinfo_db::{CredentialRepository, InMemoryCredentialRepository};
use geoinfo_types::Role;
use http_body_util::BodyExt;

pub const ADMIN: (&str, &str) = ("admin@geoinfo.ma", "admin-password");
pub const PRO: (&str, &str) = ("pro@geoinfo.ma", "pro-password");
pub const CITOYEN: (&str, &str) = ("citoyen@geoinfo.ma", "citoyen-password");

/// Router over an in-memory store seeded with one account per role
pub async fn test_app() -> Router {
    let mut config = Config::from_lookup(|key| match key {
        "TOKEN_SECRET" => Some("gateway-test-secret-0123456789abcdef".to_string()),
        _ => None,
    })
    .expect("config");
    config.auth.password = PasswordConfig::new(256, 1, 1);

    let credentials: Arc<dyn CredentialRepository> = Arc::new(InMemoryCredentialRepository::new());
    let auth = AuthService::new(config.auth.clone(), credentials).expect("auth service");
    let state = AppState::new(auth, None, config);

    for ((username, password), role) in [
        (ADMIN, Role::Admin),
        (PRO, Role::Professionnel),
        (CITOYEN, Role::Citoyen),
    ] {
        state
            .auth
            .register(username, password, [role])
            .await
            .expect("seed account");
    }

    build_router(state, None)
}

pub fn json_request(method: Method, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json")
}
