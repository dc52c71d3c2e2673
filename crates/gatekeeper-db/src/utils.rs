//! Shared utility functions

use chrono::{DateTime, Utc};

/// Read an RFC 3339 timestamp column
///
/// Rows are always written with `to_rfc3339`; anything unreadable maps to
/// the Unix epoch so it sorts first instead of masquerading as fresh.
pub fn parse_stored_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .unwrap_or_default()
}

/// Canonical form of a login key as stored and looked up
///
/// Emails and usernames are matched case-insensitively, ignoring
/// surrounding whitespace.
///
/// # Examples
///
/// ```
/// use gatekeeper_db::utils::normalize_login_key;
///
/// assert_eq!(normalize_login_key("  Ana@Example.COM "), "ana@example.com");
/// ```
pub fn normalize_login_key(key: &str) -> String {
    key.trim().to_lowercase()
}
