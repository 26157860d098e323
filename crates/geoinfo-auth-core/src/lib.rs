//! Geoinfo Auth Core - Auth gateway business logic
//!
//! Stateless bearer-token authentication and request authorization:
//! - Password hashing and verification (Argon2id)
//! - Token issuance and validation (HS256 JWT)
//! - Ordered, first-match-wins authorization rules
//! - Per-path CORS policy with origin patterns

pub mod config;
pub mod context;
pub mod cors;
pub mod error;
mod glob;
pub mod password;
pub mod pattern;
pub mod policy;
pub mod service;
pub mod token;

pub use config::*;
pub use context::*;
pub use cors::*;
pub use error::*;
pub use password::*;
pub use pattern::*;
pub use policy::*;
pub use service::*;
pub use token::*;
