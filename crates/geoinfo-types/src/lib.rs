//! Geoinfo Types - Shared domain types
//!
//! Identity types shared between the auth core, the axum integration and
//! the gateway service:
//! - Role labels (ADMIN, PROFESSIONNEL, CITOYEN)
//! - Usernames and resolved identities

pub mod error;
pub mod identity;
pub mod role;

pub use error::*;
pub use identity::*;
pub use role::*;
