//! API error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Auth error: {0}")]
    Auth(#[from] gatekeeper_auth::AuthError),

    #[error("Database error: {0}")]
    Database(#[from] gatekeeper_db::DbError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            // Auth errors carry their own generic client messages
            ApiError::Auth(e) => return e.into_response(),
            ApiError::Database(e) => match e {
                gatekeeper_db::DbError::Duplicate(msg) => (StatusCode::CONFLICT, msg),
                other => {
                    error!("Database failure: {}", other);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal error".to_string(),
                    )
                }
            },
        };

        let body = axum::Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
