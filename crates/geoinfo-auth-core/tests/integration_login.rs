//! Integration tests for login, provisioning and password change
//! against the in-memory credential store

use std::sync::Arc;
use std::time::Duration;

use geoinfo_auth_core::{
    AuthConfig, AuthError, AuthService, PasswordConfig, SecurityContext, TokenConfig,
};
use geoinfo_db::{CredentialRepository, InMemoryCredentialRepository};
use geoinfo_types::{Role, Username};

const SECRET: &str = "integration-test-secret-0123456789abcdef";

fn service() -> (AuthService<InMemoryCredentialRepository>, InMemoryCredentialRepository) {
    let repo = InMemoryCredentialRepository::new();
    let config = AuthConfig::new(
        TokenConfig::try_new(SECRET)
            .unwrap()
            .with_ttl(Duration::from_secs(2 * 3600)),
    )
    .with_password(PasswordConfig::new(256, 1, 1));
    let service = AuthService::new(config, Arc::new(repo.clone())).unwrap();
    (service, repo)
}

#[tokio::test]
async fn test_login_issues_token_with_roles() {
    let (service, _) = service();
    service
        .register("admin@geoinfo.ma", "admin-password", [Role::Admin])
        .await
        .unwrap();

    let outcome = service.login("admin@geoinfo.ma", "admin-password").await.unwrap();
    assert!(outcome.identity.is_admin());
    assert_eq!(
        (outcome.token.expires_at - outcome.token.issued_at).num_seconds(),
        2 * 3600
    );

    let header = format!("Bearer {}", outcome.token.token);
    match service.authenticate(Some(&header)) {
        SecurityContext::Authenticated(identity) => {
            assert_eq!(identity, outcome.identity);
        }
        other => panic!("expected authenticated context, got {other:?}"),
    }
}

#[tokio::test]
async fn test_login_wrong_password_and_unknown_user_look_alike() {
    let (service, _) = service();
    service
        .register("citoyen@geoinfo.ma", "citoyen-password", [Role::Citoyen])
        .await
        .unwrap();

    let wrong_password = service.login("citoyen@geoinfo.ma", "nope-nope").await;
    let unknown_user = service.login("ghost@geoinfo.ma", "citoyen-password").await;
    let empty_user = service.login("   ", "citoyen-password").await;

    assert_eq!(wrong_password.unwrap_err(), AuthError::CredentialMismatch);
    assert_eq!(unknown_user.unwrap_err(), AuthError::CredentialMismatch);
    assert_eq!(empty_user.unwrap_err(), AuthError::CredentialMismatch);
}

#[tokio::test]
async fn test_password_is_stored_hashed() {
    let (service, repo) = service();
    service
        .register("pro@geoinfo.ma", "pro-password-1", [Role::Professionnel])
        .await
        .unwrap();

    let row = repo.find_by_username("pro@geoinfo.ma").await.unwrap().unwrap();
    assert_ne!(row.password_hash, "pro-password-1");
    assert!(row.password_hash.starts_with("$argon2id$"));
    assert_eq!(row.roles, vec!["PROFESSIONNEL".to_string()]);
}

#[tokio::test]
async fn test_register_rejects_duplicates_and_weak_passwords() {
    let (service, _) = service();
    service
        .register("pro@geoinfo.ma", "pro-password-1", [Role::Professionnel])
        .await
        .unwrap();

    let duplicate = service
        .register("pro@geoinfo.ma", "another-password", [Role::Citoyen])
        .await;
    assert_eq!(duplicate.unwrap_err(), AuthError::UsernameTaken);

    let weak = service.register("new@geoinfo.ma", "short", [Role::Citoyen]).await;
    assert!(matches!(weak, Err(AuthError::InvalidInput(_))));
}

#[tokio::test]
async fn test_change_password() {
    let (service, _) = service();
    service
        .register("citoyen@geoinfo.ma", "first-password", [Role::Citoyen])
        .await
        .unwrap();
    let username = Username::parse("citoyen@geoinfo.ma").unwrap();

    let wrong_current = service
        .change_password(&username, "not-the-password", "second-password")
        .await;
    assert_eq!(wrong_current.unwrap_err(), AuthError::CredentialMismatch);

    service
        .change_password(&username, "first-password", "second-password")
        .await
        .unwrap();

    assert_eq!(
        service
            .login("citoyen@geoinfo.ma", "first-password")
            .await
            .unwrap_err(),
        AuthError::CredentialMismatch
    );
    assert!(service
        .login("citoyen@geoinfo.ma", "second-password")
        .await
        .is_ok());
}

#[tokio::test]
async fn test_token_from_other_deployment_is_rejected() {
    let (service, _) = service();
    let (other, _) = {
        let repo = InMemoryCredentialRepository::new();
        let config = AuthConfig::new(TokenConfig::try_new("x".repeat(40)).unwrap())
            .with_password(PasswordConfig::new(256, 1, 1));
        (
            AuthService::new(config, Arc::new(repo.clone())).unwrap(),
            repo,
        )
    };
    other
        .register("admin@geoinfo.ma", "admin-password", [Role::Admin])
        .await
        .unwrap();
    let foreign = other.login("admin@geoinfo.ma", "admin-password").await.unwrap();

    let header = format!("Bearer {}", foreign.token.token);
    assert_eq!(
        service.authenticate(Some(&header)),
        SecurityContext::Rejected(AuthError::TokenInvalid)
    );
}

#[tokio::test]
async fn test_find_identity() {
    let (service, _) = service();
    assert!(service.find_identity("admin@geoinfo.ma").await.unwrap().is_none());
    service
        .register("admin@geoinfo.ma", "admin-password", [Role::Admin])
        .await
        .unwrap();
    let identity = service.find_identity("admin@geoinfo.ma").await.unwrap().unwrap();
    assert!(identity.is_admin());
}
