//! Type parsing errors

use thiserror::Error;

/// Errors raised when parsing shared types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypesError {
    /// Role label is not one of the known roles
    #[error("unknown role: {0}")]
    UnknownRole(String),

    /// Username is empty after trimming
    #[error("username must not be empty")]
    EmptyUsername,
}
