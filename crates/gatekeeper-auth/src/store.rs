//! Credential store abstraction

use async_trait::async_trait;
use gatekeeper_db::{Account, Database, DbError};

/// Read-only account lookup used by the login flow
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Find an account by login key; `Ok(None)` means no such account
    async fn find_account_by_login_key(&self, login_key: &str)
    -> Result<Option<Account>, DbError>;
}

#[async_trait]
impl CredentialStore for Database {
    async fn find_account_by_login_key(
        &self,
        login_key: &str,
    ) -> Result<Option<Account>, DbError> {
        Database::find_account_by_login_key(self, login_key).await
    }
}
