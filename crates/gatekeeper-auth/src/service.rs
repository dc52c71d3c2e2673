//! Login orchestration
//!
//! [`Authenticator`] composes the credential store, the password manager
//! and the token issuer into the login use case. Every way a login can fail
//! on the caller's side (unknown key, inactive account, wrong password)
//! collapses into [`AuthError::InvalidCredentials`].

use gatekeeper_db::{Account, AccountRole};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::AuthError;
use crate::jwt::{JwtManager, validate_ttl};
use crate::password::PasswordManager;
use crate::store::CredentialStore;

/// Tunables for the login flow
#[derive(Debug, Clone, Copy)]
pub struct AuthSettings {
    /// Lifetime of issued tokens
    pub token_ttl_secs: i64,
    /// Upper bound on a credential store lookup
    pub store_timeout: Duration,
    /// Upper bound on a single hash or verify computation
    pub hash_timeout: Duration,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            token_ttl_secs: 3600,
            store_timeout: Duration::from_secs(5),
            hash_timeout: Duration::from_secs(10),
        }
    }
}

/// Public view of an account, returned on login
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: i64,
    pub login_key: String,
    pub role: AccountRole,
    pub display_name: Option<String>,
}

impl From<&Account> for Profile {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            login_key: account.login_key.clone(),
            role: account.role,
            display_name: account.display_name.clone(),
        }
    }
}

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: String,
    pub expires_in: i64,
    pub profile: Profile,
}

/// Authentication orchestrator
pub struct Authenticator {
    store: Arc<dyn CredentialStore>,
    passwords: PasswordManager,
    jwt: Arc<JwtManager>,
    settings: AuthSettings,
}

impl Authenticator {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        passwords: PasswordManager,
        jwt: Arc<JwtManager>,
        settings: AuthSettings,
    ) -> Result<Self, AuthError> {
        validate_ttl(settings.token_ttl_secs)?;

        Ok(Self {
            store,
            passwords,
            jwt,
            settings,
        })
    }

    /// Token manager shared with the request guard
    pub fn jwt(&self) -> &Arc<JwtManager> {
        &self.jwt
    }

    /// Verify credentials and issue a token
    pub async fn login(&self, login_key: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        if login_key.trim().is_empty() || password.is_empty() {
            return Err(AuthError::InvalidInput(
                "loginKey and password are required".to_string(),
            ));
        }

        debug!("Login attempt for: {}", login_key);

        let account = self.lookup(login_key).await?;

        // Inactive and unknown accounts are checked against the decoy hash
        // so that all three failure paths cost the same
        let stored_hash = account
            .as_ref()
            .filter(|a| a.active)
            .map(|a| a.password_hash.clone());
        let password_valid = self.check_password(password, stored_hash).await?;

        let account = match account {
            Some(a) if a.active && password_valid => a,
            Some(a) if !a.active => {
                warn!("Login rejected for inactive account {}", a.id);
                return Err(failed_login());
            }
            Some(a) => {
                warn!("Login rejected for account {}: wrong password", a.id);
                return Err(failed_login());
            }
            None => {
                warn!("Login rejected: unknown login key");
                return Err(failed_login());
            }
        };

        let token = self
            .jwt
            .issue(account.id, account.role, self.settings.token_ttl_secs)?;

        metrics::counter!("gatekeeper_logins_total", "outcome" => "success").increment(1);
        info!("Account {} logged in successfully", account.id);

        Ok(LoginOutcome {
            token,
            expires_in: self.settings.token_ttl_secs,
            profile: Profile::from(&account),
        })
    }

    /// Hash a password on the blocking pool, bounded by the hash timeout
    pub async fn hash_password(&self, plain: &str) -> Result<String, AuthError> {
        let passwords = self.passwords.clone();
        let plain = plain.to_string();
        self.blocking(move || passwords.hash(&plain)).await
    }

    async fn lookup(&self, login_key: &str) -> Result<Option<Account>, AuthError> {
        match timeout(
            self.settings.store_timeout,
            self.store.find_account_by_login_key(login_key),
        )
        .await
        {
            Ok(Ok(account)) => Ok(account),
            Ok(Err(e)) => Err(AuthError::StoreUnavailable(e.to_string())),
            Err(_) => Err(AuthError::StoreUnavailable(format!(
                "lookup exceeded {:?}",
                self.settings.store_timeout
            ))),
        }
    }

    async fn check_password(
        &self,
        plain: &str,
        stored_hash: Option<String>,
    ) -> Result<bool, AuthError> {
        let passwords = self.passwords.clone();
        let plain = plain.to_string();
        self.blocking(move || match stored_hash {
            Some(hash) => passwords.verify(&plain, &hash),
            None => {
                passwords.verify_decoy(&plain);
                Ok(false)
            }
        })
        .await
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, AuthError>
    where
        F: FnOnce() -> Result<T, AuthError> + Send + 'static,
        T: Send + 'static,
    {
        match timeout(self.settings.hash_timeout, tokio::task::spawn_blocking(f)).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(AuthError::Internal(format!("hashing task failed: {}", e))),
            Err(_) => Err(AuthError::Internal(format!(
                "hashing exceeded {:?}",
                self.settings.hash_timeout
            ))),
        }
    }
}

fn failed_login() -> AuthError {
    metrics::counter!("gatekeeper_logins_total", "outcome" => "failure").increment(1);
    AuthError::InvalidCredentials
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TokenRejection;
    use crate::password::WorkFactor;
    use async_trait::async_trait;
    use chrono::Utc;
    use gatekeeper_db::DbError;
    use std::collections::HashMap;

    const SECRET: &str = "orchestrator-test-secret";

    struct MemoryStore {
        accounts: HashMap<String, Account>,
    }

    #[async_trait]
    impl CredentialStore for MemoryStore {
        async fn find_account_by_login_key(
            &self,
            login_key: &str,
        ) -> Result<Option<Account>, DbError> {
            Ok(self.accounts.get(login_key).cloned())
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl CredentialStore for BrokenStore {
        async fn find_account_by_login_key(&self, _: &str) -> Result<Option<Account>, DbError> {
            Err(DbError::Connection(sqlx::Error::PoolClosed))
        }
    }

    struct SlowStore;

    #[async_trait]
    impl CredentialStore for SlowStore {
        async fn find_account_by_login_key(&self, _: &str) -> Result<Option<Account>, DbError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(None)
        }
    }

    fn passwords() -> PasswordManager {
        PasswordManager::new(WorkFactor {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap()
    }

    fn account(id: i64, login_key: &str, password: &str, role: AccountRole, active: bool) -> Account {
        Account {
            id,
            login_key: login_key.to_string(),
            password_hash: passwords().hash(password).unwrap(),
            role,
            active,
            display_name: Some(format!("Account {}", id)),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn authenticator_with(store: Arc<dyn CredentialStore>) -> Authenticator {
        let settings = AuthSettings {
            store_timeout: Duration::from_millis(200),
            ..AuthSettings::default()
        };
        Authenticator::new(
            store,
            passwords(),
            Arc::new(JwtManager::new(SECRET, 0).unwrap()),
            settings,
        )
        .unwrap()
    }

    fn authenticator() -> Authenticator {
        let accounts = [
            account(1, "admin@x.com", "admin-password", AccountRole::Admin, true),
            account(2, "user@x.com", "user-password", AccountRole::User, true),
            account(3, "gone@x.com", "gone-password", AccountRole::Admin, false),
        ]
        .into_iter()
        .map(|a| (a.login_key.clone(), a))
        .collect();

        authenticator_with(Arc::new(MemoryStore { accounts }))
    }

    #[tokio::test]
    async fn test_login_issues_verifiable_token() {
        let auth = authenticator();

        let outcome = auth.login("admin@x.com", "admin-password").await.unwrap();
        assert_eq!(outcome.expires_in, 3600);
        assert_eq!(outcome.profile.id, 1);
        assert_eq!(outcome.profile.role, AccountRole::Admin);

        let claims = auth.jwt().verify(&outcome.token).unwrap();
        assert_eq!(claims.subject_id().unwrap(), 1);
        assert_eq!(claims.role, AccountRole::Admin);
    }

    #[tokio::test]
    async fn test_failures_are_indistinguishable() {
        let auth = authenticator();

        let unknown = auth.login("nouser@x.com", "whatever").await.unwrap_err();
        let wrong = auth.login("user@x.com", "not-the-password").await.unwrap_err();
        let inactive = auth.login("gone@x.com", "gone-password").await.unwrap_err();

        for err in [&unknown, &wrong, &inactive] {
            assert!(matches!(err, AuthError::InvalidCredentials));
        }
        assert_eq!(unknown.public_message(), wrong.public_message());
        assert_eq!(wrong.public_message(), inactive.public_message());
    }

    #[tokio::test]
    async fn test_inactive_account_never_gets_token() {
        let auth = authenticator();
        let result = auth.login("gone@x.com", "gone-password").await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_empty_input_rejected() {
        let auth = authenticator();
        assert!(matches!(
            auth.login("", "pw").await,
            Err(AuthError::InvalidInput(_))
        ));
        assert!(matches!(
            auth.login("user@x.com", "").await,
            Err(AuthError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_store_failure_is_unavailable() {
        let auth = authenticator_with(Arc::new(BrokenStore));
        assert!(matches!(
            auth.login("user@x.com", "pw").await,
            Err(AuthError::StoreUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_store_timeout_is_unavailable() {
        let auth = authenticator_with(Arc::new(SlowStore));
        assert!(matches!(
            auth.login("user@x.com", "pw").await,
            Err(AuthError::StoreUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_hash_password_round_trip() {
        let auth = authenticator();
        let hash = auth.hash_password("fresh-password").await.unwrap();
        assert!(passwords().verify("fresh-password", &hash).unwrap());
    }

    #[test]
    fn test_invalid_ttl_rejected_at_construction() {
        let result = Authenticator::new(
            Arc::new(BrokenStore),
            passwords(),
            Arc::new(JwtManager::new(SECRET, 0).unwrap()),
            AuthSettings {
                token_ttl_secs: 0,
                ..AuthSettings::default()
            },
        );
        assert!(matches!(result, Err(AuthError::Configuration(_))));
    }

    #[test]
    fn test_tokens_from_other_keys_rejected() {
        let auth = authenticator();
        let foreign = JwtManager::new("foreign", 0).unwrap();
        let token = foreign.issue(1, AccountRole::Admin, 3600).unwrap();
        assert_eq!(auth.jwt().verify(&token), Err(TokenRejection::BadSignature));
    }
}
