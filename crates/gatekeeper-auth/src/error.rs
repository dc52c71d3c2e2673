//! Authentication error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Message returned for every failed login, whatever the cause
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid login key or password";

/// Message returned for every rejected token, whatever the reason
pub const INVALID_TOKEN_MESSAGE: &str = "Invalid or missing token";

/// Why a presented token was not accepted
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRejection {
    #[error("no token presented")]
    Missing,

    #[error("token is malformed")]
    Malformed,

    #[error("token signature does not verify")]
    BadSignature,

    #[error("token has expired")]
    Expired,
}

impl TokenRejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenRejection::Missing => "missing",
            TokenRejection::Malformed => "malformed",
            TokenRejection::BadSignature => "bad_signature",
            TokenRejection::Expired => "expired",
        }
    }
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token rejected: {0}")]
    Token(#[from] TokenRejection),

    #[error("Insufficient permissions")]
    Forbidden,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Credential store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials | AuthError::Token(_) => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AuthError::StoreUnavailable(_)
            | AuthError::Configuration(_)
            | AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to an unauthenticated caller
    pub fn public_message(&self) -> String {
        match self {
            AuthError::InvalidCredentials => INVALID_CREDENTIALS_MESSAGE.to_string(),
            AuthError::Token(_) => INVALID_TOKEN_MESSAGE.to_string(),
            AuthError::Forbidden => "Insufficient permissions".to_string(),
            AuthError::InvalidInput(msg) => msg.clone(),
            AuthError::StoreUnavailable(_)
            | AuthError::Configuration(_)
            | AuthError::Internal(_) => "Internal error".to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Authentication failure: {}", self);
        }

        let body = axum::Json(json!({
            "error": self.public_message()
        }));

        (status, body).into_response()
    }
}
