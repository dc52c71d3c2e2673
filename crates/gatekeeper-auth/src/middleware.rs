//! Request guard middleware for Axum
//!
//! `require_auth` turns a bearer token into a [`Principal`] stored in the
//! request extensions; handlers receive it through the `Principal`
//! extractor. `require_role` narrows a route to a set of roles and must be
//! layered inside `require_auth`.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use gatekeeper_db::AccountRole;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::error::{AuthError, TokenRejection};
use crate::jwt::{Claims, JwtManager};

/// Alternate header accepted when no `Authorization` header is sent
pub const ACCESS_TOKEN_HEADER: &str = "x-access-token";

/// Authenticated identity for the current request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub subject_id: i64,
    pub role: AccountRole,
}

impl Principal {
    /// Create from verified JWT claims
    pub fn from_claims(claims: &Claims) -> Result<Self, TokenRejection> {
        Ok(Self {
            subject_id: claims.subject_id()?,
            role: claims.role,
        })
    }
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Only present when the route sits behind `require_auth`
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or(AuthError::Token(TokenRejection::Missing))
    }
}

/// Roles permitted on a route
#[derive(Debug, Clone, Copy)]
pub struct AllowedRoles(pub &'static [AccountRole]);

impl AllowedRoles {
    pub const ADMIN: Self = Self(&[AccountRole::Admin]);
    pub const ANY: Self = Self(&[AccountRole::Admin, AccountRole::User]);

    pub fn permits(&self, role: AccountRole) -> bool {
        self.0.contains(&role)
    }

    /// Reject a principal whose role is not in the set
    pub fn check(&self, principal: &Principal) -> Result<(), AuthError> {
        if self.permits(principal.role) {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }
}

/// Extract the presented token, if any
///
/// An `Authorization` header that is not a bearer credential is malformed
/// rather than missing.
fn extract_token(headers: &HeaderMap) -> Result<&str, TokenRejection> {
    if let Some(value) = headers.get(AUTHORIZATION) {
        let value = value.to_str().map_err(|_| TokenRejection::Malformed)?;
        let token = value
            .strip_prefix("Bearer ")
            .ok_or(TokenRejection::Malformed)?
            .trim();
        if token.is_empty() {
            return Err(TokenRejection::Missing);
        }
        return Ok(token);
    }

    match headers.get(ACCESS_TOKEN_HEADER) {
        Some(value) => {
            let token = value.to_str().map_err(|_| TokenRejection::Malformed)?.trim();
            if token.is_empty() {
                Err(TokenRejection::Missing)
            } else {
                Ok(token)
            }
        }
        None => Err(TokenRejection::Missing),
    }
}

fn reject(reason: TokenRejection) -> AuthError {
    metrics::counter!("gatekeeper_token_rejections_total", "reason" => reason.as_str())
        .increment(1);
    debug!("Request rejected: {}", reason);
    AuthError::Token(reason)
}

/// Authentication middleware
///
/// Verifies the token on every request. On failure the request is answered
/// with 401 and the inner service is never called; on success the
/// [`Principal`] is added to request extensions and the inner service runs
/// once.
pub async fn require_auth(
    State(jwt_manager): State<Arc<JwtManager>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let claims = {
        let token = extract_token(request.headers()).map_err(reject)?;
        jwt_manager.verify(token).map_err(reject)?
    };
    let principal = Principal::from_claims(&claims).map_err(reject)?;

    debug!(
        "Authenticated account: {} ({})",
        principal.subject_id,
        principal.role.as_str()
    );

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

/// Middleware to require one of a set of roles
pub async fn require_role(
    State(allowed): State<AllowedRoles>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let principal = request
        .extensions()
        .get::<Principal>()
        .ok_or(AuthError::Token(TokenRejection::Missing))?;

    if let Err(e) = allowed.check(principal) {
        debug!(
            "Account {} with role {} denied",
            principal.subject_id,
            principal.role.as_str()
        );
        return Err(e);
    }

    Ok(next.run(request).await)
}
