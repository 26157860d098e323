//! Repository traits

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::CredentialRow;

/// Credential repository trait
#[async_trait]
pub trait CredentialRepository: Send + Sync {
    /// Find a credential by login identifier
    async fn find_by_username(&self, username: &str) -> DbResult<Option<CredentialRow>>;

    /// Provision a new credential
    async fn create(&self, credential: CreateCredential) -> DbResult<CredentialRow>;

    /// Replace the stored password hash
    async fn update_password_hash(&self, username: &str, password_hash: &str) -> DbResult<()>;
}

/// Create credential input
#[derive(Debug, Clone)]
pub struct CreateCredential {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub roles: Vec<String>,
}
