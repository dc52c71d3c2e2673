//! Gatekeeper REST API
//!
//! This crate provides the Axum-based HTTP surface for Gatekeeper:
//! login, principal lookup, account administration, health and metrics.

pub mod error;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::{AppState, MetricsHandle};
