//! PostgreSQL credential repository implementation

use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::{DbError, DbResult};
use crate::models::CredentialRow;
use crate::repo::{CreateCredential, CredentialRepository};

/// Postgres unique_violation SQLSTATE
const UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL credential repository
#[derive(Clone)]
pub struct PgCredentialRepository {
    pool: PgPool,
}

impl PgCredentialRepository {
    /// Create a new credential repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialRepository for PgCredentialRepository {
    async fn find_by_username(&self, username: &str) -> DbResult<Option<CredentialRow>> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r#"
            SELECT id, username, password_hash, roles, created_at, updated_at
            FROM utilisateurs
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn create(&self, credential: CreateCredential) -> DbResult<CredentialRow> {
        let result = sqlx::query_as::<_, CredentialRow>(
            r#"
            INSERT INTO utilisateurs (id, username, password_hash, roles, created_at, updated_at)
            VALUES ($1, $2, $3, $4, NOW(), NOW())
            RETURNING id, username, password_hash, roles, created_at, updated_at
            "#,
        )
        .bind(credential.id)
        .bind(&credential.username)
        .bind(&credential.password_hash)
        .bind(&credential.roles)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => Ok(row),
            Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                tracing::debug!(username = %credential.username, "Username already provisioned");
                Err(DbError::Conflict(credential.username))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update_password_hash(&self, username: &str, password_hash: &str) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE utilisateurs
            SET password_hash = $2, updated_at = NOW()
            WHERE username = $1
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        Ok(())
    }
}
