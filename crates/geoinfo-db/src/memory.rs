//! In-memory credential repository

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

use crate::error::{DbError, DbResult};
use crate::models::CredentialRow;
use crate::repo::{CreateCredential, CredentialRepository};

/// Credential store kept in process memory.
///
/// Used when no `DATABASE_URL` is configured and by tests. Contents are lost
/// on restart.
#[derive(Default, Clone)]
pub struct InMemoryCredentialRepository {
    credentials: Arc<DashMap<String, CredentialRow>>,
}

impl InMemoryCredentialRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored credentials
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}

#[async_trait]
impl CredentialRepository for InMemoryCredentialRepository {
    async fn find_by_username(&self, username: &str) -> DbResult<Option<CredentialRow>> {
        Ok(self.credentials.get(username).map(|r| r.value().clone()))
    }

    async fn create(&self, credential: CreateCredential) -> DbResult<CredentialRow> {
        match self.credentials.entry(credential.username.clone()) {
            Entry::Occupied(_) => Err(DbError::Conflict(credential.username)),
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let row = CredentialRow {
                    id: credential.id,
                    username: credential.username,
                    password_hash: credential.password_hash,
                    roles: credential.roles,
                    created_at: now,
                    updated_at: now,
                };
                slot.insert(row.clone());
                Ok(row)
            }
        }
    }

    async fn update_password_hash(&self, username: &str, password_hash: &str) -> DbResult<()> {
        let mut row = self.credentials.get_mut(username).ok_or(DbError::NotFound)?;
        row.password_hash = password_hash.to_string();
        row.updated_at = Utc::now();
        Ok(())
    }
}
