//! Management API routes
//!
//! Login is public. Everything else sits behind the token guard, and
//! account administration additionally requires the admin role.

pub mod accounts;
pub mod auth;
pub mod types;

use axum::{Router, middleware::from_fn_with_state};
use gatekeeper_auth::{AllowedRoles, require_auth, require_role};

use crate::state::AppState;

/// Create management API routes
pub fn routes(state: &AppState) -> Router<AppState> {
    let admin = accounts::routes().layer(from_fn_with_state(AllowedRoles::ADMIN, require_role));

    let protected = Router::new()
        .merge(auth::protected_routes())
        .merge(admin)
        .layer(from_fn_with_state(state.auth.jwt().clone(), require_auth));

    Router::new().merge(auth::routes()).merge(protected)
}
