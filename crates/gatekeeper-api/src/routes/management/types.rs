//! Request/Response DTOs for management API

use gatekeeper_auth::Profile;
use gatekeeper_db::{Account, AccountRole};
use serde::{Deserialize, Serialize};

// ==================== Auth Types ====================

/// Login request
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub login_key: String,
    pub password: String,
}

/// Login response
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: i64,
    pub profile: Profile,
}

// ==================== Account Types ====================

/// Create account request
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    pub login_key: String,
    pub password: String,
    pub role: AccountRole,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Update account request; absent fields are left unchanged
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    pub role: Option<AccountRole>,
    pub password: Option<String>,
    pub active: Option<bool>,
    pub display_name: Option<String>,
}

/// Account response (without password hash)
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub id: i64,
    pub login_key: String,
    pub role: AccountRole,
    pub active: bool,
    pub display_name: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            login_key: account.login_key,
            role: account.role,
            active: account.active,
            display_name: account.display_name,
            created_at: account.created_at.to_rfc3339(),
            updated_at: account.updated_at.to_rfc3339(),
        }
    }
}
