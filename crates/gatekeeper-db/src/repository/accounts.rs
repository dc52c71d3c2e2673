//! Account operations

use chrono::Utc;
use sqlx::Row;
use tracing::debug;

use crate::error::DbError;
use crate::models::{Account, AccountRole, NewAccount};
use crate::repository::Database;
use crate::utils::normalize_login_key;

const ACCOUNT_COLUMNS: &str =
    "id, login_key, password_hash, role, active, display_name, created_at, updated_at";

impl Database {
    // ==================== Account Operations ====================

    /// Insert a new, active account
    pub async fn insert_account(&self, account: NewAccount) -> Result<Account, DbError> {
        let now = Utc::now();
        let login_key = normalize_login_key(&account.login_key);

        // The UNIQUE constraint is the only duplicate check, so racing inserts
        // of one key resolve to a single row and a Duplicate error
        let result = sqlx::query(
            r#"
            INSERT INTO accounts (login_key, password_hash, role, active, display_name, created_at, updated_at)
            VALUES (?, ?, ?, 1, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&login_key)
        .bind(&account.password_hash)
        .bind(account.role.as_str())
        .bind(&account.display_name)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                DbError::Duplicate(format!("Account '{}' already exists", login_key))
            }
            other => DbError::Connection(other),
        })?;

        let id: i64 = result.get("id");
        debug!("Inserted account {} ({})", id, login_key);

        Ok(Account {
            id,
            login_key,
            password_hash: account.password_hash,
            role: account.role,
            active: true,
            display_name: account.display_name,
            created_at: now,
            updated_at: now,
        })
    }

    /// Look up an account by its login key
    ///
    /// Returns `Ok(None)` when no account matches; errors are reserved for
    /// store failures.
    pub async fn find_account_by_login_key(
        &self,
        login_key: &str,
    ) -> Result<Option<Account>, DbError> {
        let login_key = normalize_login_key(login_key);
        let result = sqlx::query(&format!(
            "SELECT {} FROM accounts WHERE login_key = ?",
            ACCOUNT_COLUMNS
        ))
        .bind(&login_key)
        .fetch_optional(&self.pool)
        .await?;

        result
            .map(|row| Account::try_from(&row).map_err(DbError::from))
            .transpose()
    }

    /// Get an account by ID
    pub async fn get_account_by_id(&self, id: i64) -> Result<Option<Account>, DbError> {
        let result = sqlx::query(&format!(
            "SELECT {} FROM accounts WHERE id = ?",
            ACCOUNT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        result
            .map(|row| Account::try_from(&row).map_err(DbError::from))
            .transpose()
    }

    /// List all accounts, active or not
    pub async fn list_accounts(&self) -> Result<Vec<Account>, DbError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM accounts ORDER BY login_key",
            ACCOUNT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| Account::try_from(row).map_err(DbError::from))
            .collect()
    }

    /// Update account role
    pub async fn update_account_role(&self, id: i64, role: AccountRole) -> Result<bool, DbError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET role = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(role.as_str())
        .bind(now.to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Update account password hash
    pub async fn update_account_password(
        &self,
        id: i64,
        password_hash: &str,
    ) -> Result<bool, DbError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET password_hash = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(password_hash)
        .bind(now.to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Activate or deactivate an account (accounts are never deleted)
    pub async fn set_account_active(&self, id: i64, active: bool) -> Result<bool, DbError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET active = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(active)
        .bind(now.to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Update the display name shown in profiles
    pub async fn update_account_display_name(
        &self,
        id: i64,
        display_name: Option<&str>,
    ) -> Result<bool, DbError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET display_name = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(display_name)
        .bind(now.to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Check if any accounts exist
    pub async fn has_accounts(&self) -> Result<bool, DbError> {
        let result = sqlx::query("SELECT COUNT(*) as count FROM accounts")
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = result.get("count");
        Ok(count > 0)
    }
}
