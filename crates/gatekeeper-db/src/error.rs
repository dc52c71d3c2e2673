//! Credential store errors

use thiserror::Error;

/// Failures of the account store
///
/// A missing account is not an error here; lookups return `Ok(None)`.
#[derive(Error, Debug)]
pub enum DbError {
    /// The store could not be reached or a query failed
    #[error("Account store error: {0}")]
    Connection(#[from] sqlx::Error),

    /// A login key is already taken
    #[error("Duplicate account: {0}")]
    Duplicate(String),

    #[error("Schema migration failed: {0}")]
    Migration(String),
}
