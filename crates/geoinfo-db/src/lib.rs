//! Geoinfo DB - Credential store
//!
//! Repository abstraction over stored, hashed credentials, with a
//! PostgreSQL implementation and an in-memory one for local runs and tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use geoinfo_db::{create_pool, run_migrations, CredentialRepository, PgCredentialRepository};
//!
//! let pool = create_pool("postgres://localhost/geoinfo").await?;
//! run_migrations(&pool).await?;
//! let repo = PgCredentialRepository::new(pool);
//!
//! let row = repo.find_by_username("agent@geoinfo.ma").await?;
//! ```

pub mod error;
pub mod memory;
pub mod migrations;
pub mod models;
pub mod pg;
pub mod pool;
pub mod repo;

pub use error::{DbError, DbResult};
pub use memory::InMemoryCredentialRepository;
pub use migrations::run_migrations;
pub use models::*;
pub use pg::PgCredentialRepository;
pub use pool::{create_pool, DbPool};
pub use repo::*;
