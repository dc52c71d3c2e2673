//! Database models

use crate::utils::parse_stored_timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use std::fmt;
use std::str::FromStr;

/// Error type for parsing models from strings
#[derive(Debug, Clone)]
pub enum ParseError {
    InvalidAccountRole(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::InvalidAccountRole(s) => write!(f, "Invalid account role: {}", s),
        }
    }
}

impl std::error::Error for ParseError {}

/// Account role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AccountRole {
    Admin,
    User,
}

impl AccountRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountRole::Admin => "admin",
            AccountRole::User => "user",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, AccountRole::Admin)
    }
}

impl fmt::Display for AccountRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountRole {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(AccountRole::Admin),
            "user" => Ok(AccountRole::User),
            _ => Err(ParseError::InvalidAccountRole(s.to_string())),
        }
    }
}

/// Account model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub login_key: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: AccountRole,
    pub active: bool,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New account (for insertion)
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub login_key: String,
    pub password_hash: String,
    pub role: AccountRole,
    pub display_name: Option<String>,
}

// ==================== TryFrom Implementations ====================

impl TryFrom<&sqlx::sqlite::SqliteRow> for Account {
    type Error = sqlx::Error;

    fn try_from(row: &sqlx::sqlite::SqliteRow) -> Result<Self, Self::Error> {
        let role_str: String = row.try_get("role")?;
        Ok(Account {
            id: row.try_get("id")?,
            login_key: row.try_get("login_key")?,
            password_hash: row.try_get("password_hash")?,
            // Unknown roles degrade to the least privileged one
            role: AccountRole::from_str(&role_str).unwrap_or(AccountRole::User),
            active: row.try_get("active")?,
            display_name: row.try_get("display_name")?,
            created_at: parse_stored_timestamp(&row.try_get::<String, _>("created_at")?),
            updated_at: parse_stored_timestamp(&row.try_get::<String, _>("updated_at")?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!("admin".parse::<AccountRole>().unwrap(), AccountRole::Admin);
        assert_eq!("user".parse::<AccountRole>().unwrap(), AccountRole::User);
        assert!("root".parse::<AccountRole>().is_err());
        assert!("Admin".parse::<AccountRole>().is_err());
    }

    #[test]
    fn test_account_serialization_hides_hash() {
        let account = Account {
            id: 7,
            login_key: "ana@example.com".to_string(),
            password_hash: "$argon2id$v=19$secret".to_string(),
            role: AccountRole::Admin,
            active: true,
            display_name: Some("Ana".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_string(&account).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(!json.contains("password_hash"));
        assert!(json.contains("\"role\":\"admin\""));
    }
}
