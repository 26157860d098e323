//! Database errors

use thiserror::Error;

/// Database errors
#[derive(Error, Debug)]
pub enum DbError {
    /// SQLx error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Schema migration failed
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// Record not found
    #[error("record not found")]
    NotFound,

    /// Unique constraint violated (username already taken)
    #[error("record already exists: {0}")]
    Conflict(String),
}

/// Database result type
pub type DbResult<T> = Result<T, DbError>;
