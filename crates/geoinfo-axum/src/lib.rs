//! Geoinfo Axum Integration
//!
//! Tower layers and Axum extractors that put the auth gateway in front of
//! an Axum router.
//!
//! # Overview
//!
//! Requests flow through two layers before reaching a handler:
//! - [`CorsLayer`] answers preflights and decorates cross-origin responses
//! - [`AuthLayer`] resolves the bearer token and applies the ordered rules
//!
//! Handlers then read the bound identity through extractors.
//!
//! # Quick Start
//!
//! ```ignore
//! use geoinfo_axum::{AuthLayer, CorsLayer, RequireAuth};
//! use axum::{Router, routing::get};
//!
//! async fn me(auth: RequireAuth) -> String {
//!     format!("Hello, {}!", auth.username)
//! }
//!
//! let app = Router::new()
//!     .route("/api/auth/me", get(me))
//!     .layer(AuthLayer::new(tokens, policy))
//!     .layer(CorsLayer::new(cors));
//! ```
//!
//! # Extractors
//!
//! - [`RequireAuth`] - Requires a valid token (401 with the token error otherwise)
//! - [`MaybeAuth`] - Optional identity
//! - [`RequireAdmin`] / [`RequireProfessionnel`] - Requires a role (403 if missing)

pub mod context;
pub mod cors;
pub mod error;
pub mod extractors;
pub mod layer;

pub use context::AuthContextExt;
pub use cors::{CorsLayer, CorsMiddleware};
pub use error::AuthRejection;
pub use extractors::{
    AdminRole, MaybeAuth, ProfessionnelRole, RequireAdmin, RequireAuth, RequireProfessionnel,
    RequireRole, RoleMarker,
};
pub use layer::{AuthLayer, AuthMiddleware};
