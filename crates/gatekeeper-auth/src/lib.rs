//! Gatekeeper Authentication and Authorization
//!
//! This crate provides password hashing, JWT issuance and verification,
//! the request guard middleware, and the login orchestrator built on top
//! of them.

pub mod error;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod service;
pub mod store;

pub use error::{AuthError, TokenRejection};
pub use jwt::{Claims, JwtManager, MAX_CLOCK_SKEW_SECS, MAX_TOKEN_TTL_SECS};
pub use middleware::{AllowedRoles, Principal, require_auth, require_role};
pub use password::{PasswordManager, WorkFactor};
pub use service::{AuthSettings, Authenticator, LoginOutcome, Profile};
pub use store::CredentialStore;
