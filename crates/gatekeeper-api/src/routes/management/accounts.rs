//! Account administration routes (admin only)

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    routing::get,
};
use gatekeeper_auth::Principal;
use gatekeeper_db::{Account, NewAccount};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::AppState;

use super::auth::{MAX_LOGIN_KEY_LENGTH, MAX_PASSWORD_LENGTH};
use super::types::{AccountResponse, CreateAccountRequest, UpdateAccountRequest};

// ==================== Input Validation ====================

/// Minimum allowed password length for new passwords
const MIN_PASSWORD_LENGTH: usize = 8;
/// Maximum allowed display name length
const MAX_DISPLAY_NAME_LENGTH: usize = 128;

/// Validate login key format and length
fn validate_login_key(login_key: &str) -> Result<(), ApiError> {
    let login_key = login_key.trim();
    if login_key.is_empty() {
        return Err(ApiError::BadRequest("loginKey cannot be empty".to_string()));
    }
    if login_key.len() > MAX_LOGIN_KEY_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "loginKey exceeds maximum length of {} characters",
            MAX_LOGIN_KEY_LENGTH
        )));
    }
    // Usernames and email addresses only
    if !login_key
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '@' | '+'))
    {
        return Err(ApiError::BadRequest(
            "loginKey may only contain letters, digits and _ - . @ +".to_string(),
        ));
    }
    Ok(())
}

/// Validate password length
fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        )));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Password exceeds maximum length of {} characters",
            MAX_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

fn validate_display_name(display_name: &str) -> Result<(), ApiError> {
    if display_name.chars().count() > MAX_DISPLAY_NAME_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "displayName exceeds maximum length of {} characters",
            MAX_DISPLAY_NAME_LENGTH
        )));
    }
    Ok(())
}

fn bad_body(e: JsonRejection) -> ApiError {
    ApiError::BadRequest(e.body_text())
}

async fn load_account(state: &AppState, id: i64) -> Result<Account, ApiError> {
    state
        .db
        .get_account_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Account: {}", id)))
}

// ==================== Account Routes ====================

/// GET /api/v1/accounts
async fn list_accounts(State(state): State<AppState>) -> Result<Json<Vec<AccountResponse>>, ApiError> {
    let accounts = state.db.list_accounts().await?;
    Ok(Json(accounts.into_iter().map(AccountResponse::from).collect()))
}

/// POST /api/v1/accounts
async fn create_account(
    State(state): State<AppState>,
    payload: Result<Json<CreateAccountRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AccountResponse>), ApiError> {
    let Json(request) = payload.map_err(bad_body)?;
    validate_login_key(&request.login_key)?;
    validate_password(&request.password)?;
    if let Some(display_name) = &request.display_name {
        validate_display_name(display_name)?;
    }

    debug!("Creating account: {}", request.login_key);

    let password_hash = state.auth.hash_password(&request.password).await?;

    let account = state
        .db
        .insert_account(NewAccount {
            login_key: request.login_key,
            password_hash,
            role: request.role,
            display_name: request.display_name,
        })
        .await?;

    info!("Created account {} ({})", account.id, account.role);

    Ok((StatusCode::CREATED, Json(AccountResponse::from(account))))
}

/// GET /api/v1/accounts/{id}
async fn get_account(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = load_account(&state, id).await?;
    Ok(Json(AccountResponse::from(account)))
}

/// PUT /api/v1/accounts/{id}
async fn update_account(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<UpdateAccountRequest>, JsonRejection>,
) -> Result<Json<AccountResponse>, ApiError> {
    let Json(request) = payload.map_err(bad_body)?;
    debug!("Updating account: {}", id);

    // Verify account exists
    load_account(&state, id).await?;

    // An admin cannot lock themselves out
    if principal.subject_id == id {
        if request.active == Some(false) {
            return Err(ApiError::BadRequest(
                "Cannot deactivate your own account".to_string(),
            ));
        }
        if request.role.is_some_and(|r| !r.is_admin()) {
            return Err(ApiError::BadRequest(
                "Cannot remove your own admin role".to_string(),
            ));
        }
    }

    if let Some(display_name) = &request.display_name {
        validate_display_name(display_name)?;
    }
    if let Some(password) = &request.password {
        validate_password(password)?;
    }

    // Hash before any write so a hashing failure leaves the account untouched
    let password_hash = match &request.password {
        Some(password) => Some(state.auth.hash_password(password).await?),
        None => None,
    };

    if let Some(role) = request.role {
        state.db.update_account_role(id, role).await?;
    }

    if let Some(password_hash) = &password_hash {
        state.db.update_account_password(id, password_hash).await?;
    }

    if let Some(active) = request.active {
        state.db.set_account_active(id, active).await?;
    }

    if let Some(display_name) = &request.display_name {
        let display_name = Some(display_name.as_str()).filter(|n| !n.is_empty());
        state
            .db
            .update_account_display_name(id, display_name)
            .await?;
    }

    let account = load_account(&state, id).await?;
    info!("Updated account {}", account.id);

    Ok(Json(AccountResponse::from(account)))
}

/// DELETE /api/v1/accounts/{id}
///
/// Accounts are never removed; this deactivates them.
async fn deactivate_account(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if principal.subject_id == id {
        return Err(ApiError::BadRequest(
            "Cannot deactivate your own account".to_string(),
        ));
    }

    if state.db.set_account_active(id, false).await? {
        info!("Deactivated account {}", id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Account: {}", id)))
    }
}

/// Create account routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/accounts", get(list_accounts).post(create_account))
        .route(
            "/api/v1/accounts/{id}",
            get(get_account)
                .put(update_account)
                .delete(deactivate_account),
        )
}
