//! Database row models

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Stored credential row
///
/// `password_hash` is a PHC string; the plaintext is never stored.
/// Roles are kept as their upper-case labels.
#[derive(Debug, Clone, FromRow)]
pub struct CredentialRow {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub roles: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
