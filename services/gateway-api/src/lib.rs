//! Gateway API library crate.
//!
//! Exposes configuration, state and the router so the binary and the
//! integration tests build the exact same application.

pub mod app;
pub mod config;
pub mod error;
pub mod handlers;
pub mod state;
