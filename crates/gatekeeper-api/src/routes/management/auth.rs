//! Login and principal routes

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::{get, post},
};
use gatekeeper_auth::Principal;
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

use super::types::{LoginRequest, LoginResponse};

// ==================== Input Validation ====================

/// Maximum allowed login key length (longest valid email address)
pub const MAX_LOGIN_KEY_LENGTH: usize = 254;
/// Maximum allowed password length (prevent DoS with very large passwords)
pub const MAX_PASSWORD_LENGTH: usize = 256;

/// Reject oversized credentials before they reach the hasher
fn validate_credentials_size(request: &LoginRequest) -> Result<(), ApiError> {
    if request.login_key.len() > MAX_LOGIN_KEY_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "loginKey exceeds maximum length of {} characters",
            MAX_LOGIN_KEY_LENGTH
        )));
    }
    if request.password.len() > MAX_PASSWORD_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "password exceeds maximum length of {} characters",
            MAX_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

// ==================== Auth Routes ====================

/// POST /api/v1/auth/login
async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| {
        debug!("Rejected login body: {}", e);
        ApiError::BadRequest("Request body must be {\"loginKey\", \"password\"}".to_string())
    })?;
    validate_credentials_size(&request)?;

    let outcome = state
        .auth
        .login(&request.login_key, &request.password)
        .await?;

    Ok(Json(LoginResponse {
        token: outcome.token,
        expires_in: outcome.expires_in,
        profile: outcome.profile,
    }))
}

/// GET /api/v1/auth/me
async fn me(principal: Principal) -> Json<Principal> {
    Json(principal)
}

/// Public auth routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/api/v1/auth/login", post(login))
}

/// Auth routes that need a verified token
pub fn protected_routes() -> Router<AppState> {
    Router::new().route("/api/v1/auth/me", get(me))
}
