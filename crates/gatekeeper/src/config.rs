//! Configuration loading and validation

use anyhow::{Context, Result, bail};
use gatekeeper_auth::{AuthSettings, MAX_CLOCK_SKEW_SECS, MAX_TOKEN_TTL_SECS, WorkFactor};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Secrets shorter than this are accepted with a warning
const RECOMMENDED_SECRET_BYTES: usize = 32;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Authentication configuration
///
/// There is deliberately no default signing secret: it must come from the
/// file or `GATEKEEPER_JWT_SECRET`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default, skip_serializing)]
    pub jwt_secret: Option<String>,
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: i64,
    #[serde(default)]
    pub clock_skew_secs: u64,
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,
    #[serde(default = "default_hash_timeout_ms")]
    pub hash_timeout_ms: u64,
    #[serde(default)]
    pub work_factor: WorkFactor,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_ttl_secs: default_token_ttl_secs(),
            clock_skew_secs: 0,
            store_timeout_ms: default_store_timeout_ms(),
            hash_timeout_ms: default_hash_timeout_ms(),
            work_factor: WorkFactor::default(),
        }
    }
}

impl AuthConfig {
    /// The signing secret, once `Config::validate` has accepted it
    pub fn secret(&self) -> Result<&str> {
        match self.jwt_secret.as_deref() {
            Some(secret) if !secret.is_empty() => Ok(secret),
            _ => bail!(
                "auth.jwt_secret is not set; provide it in the config file or via GATEKEEPER_JWT_SECRET"
            ),
        }
    }

    pub fn settings(&self) -> AuthSettings {
        AuthSettings {
            token_ttl_secs: self.token_ttl_secs,
            store_timeout: Duration::from_millis(self.store_timeout_ms),
            hash_timeout: Duration::from_millis(self.hash_timeout_ms),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
        }
    }
}

/// First-run admin account; the password only ever comes from the environment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    #[serde(default = "default_admin_login_key")]
    pub admin_login_key: String,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            admin_login_key: default_admin_login_key(),
        }
    }
}

// Default value functions
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_db_path() -> String {
    "./data/gatekeeper.db".to_string()
}

fn default_token_ttl_secs() -> i64 {
    3600
}

fn default_store_timeout_ms() -> u64 {
    5_000
}

fn default_hash_timeout_ms() -> u64 {
    10_000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_admin_login_key() -> String {
    "admin".to_string()
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &str) -> Result<Self> {
        let config_path = Path::new(path);

        // Check if config file exists
        if !config_path.exists() {
            info!("Config file not found at {}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        Self::from_toml(&content).with_context(|| format!("Failed to parse config file: {}", path))
    }

    fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Reject configurations the server must not start with
    pub fn validate(&self) -> Result<()> {
        let secret = self.auth.secret()?;
        if secret.len() < RECOMMENDED_SECRET_BYTES {
            warn!(
                "auth.jwt_secret is shorter than {} bytes; use a longer random secret",
                RECOMMENDED_SECRET_BYTES
            );
        }

        if self.auth.token_ttl_secs <= 0 || self.auth.token_ttl_secs > MAX_TOKEN_TTL_SECS {
            bail!(
                "auth.token_ttl_secs must be between 1 and {}, got {}",
                MAX_TOKEN_TTL_SECS,
                self.auth.token_ttl_secs
            );
        }

        if self.auth.clock_skew_secs > MAX_CLOCK_SKEW_SECS {
            bail!(
                "auth.clock_skew_secs must be at most {}, got {}",
                MAX_CLOCK_SKEW_SECS,
                self.auth.clock_skew_secs
            );
        }

        if self.auth.store_timeout_ms == 0 || self.auth.hash_timeout_ms == 0 {
            bail!("auth.store_timeout_ms and auth.hash_timeout_ms must be positive");
        }

        match self.logging.format.as_str() {
            "pretty" | "json" => {}
            other => bail!("logging.format must be \"pretty\" or \"json\", got {:?}", other),
        }

        if self.bootstrap.admin_login_key.trim().is_empty() {
            bail!("bootstrap.admin_login_key must not be empty");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_secret_fail_validation() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.auth.token_ttl_secs, 3600);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_full_config() {
        let config = Config::from_toml(
            r#"
            [server]
            bind_address = "127.0.0.1"
            port = 9000

            [database]
            path = "/tmp/gk.db"

            [auth]
            jwt_secret = "0123456789abcdef0123456789abcdef"
            token_ttl_secs = 900
            clock_skew_secs = 30

            [auth.work_factor]
            memory_kib = 4096

            [logging]
            level = "debug"
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.bind_address, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.database.path, "/tmp/gk.db");
        assert_eq!(config.auth.token_ttl_secs, 900);
        assert_eq!(config.auth.clock_skew_secs, 30);
        assert_eq!(config.auth.work_factor.memory_kib, 4096);
        assert_eq!(
            config.auth.work_factor.iterations,
            WorkFactor::default().iterations
        );
        assert_eq!(config.logging.format, "json");
        assert!(config.validate().is_ok());

        let settings = config.auth.settings();
        assert_eq!(settings.token_ttl_secs, 900);
        assert_eq!(settings.store_timeout, Duration::from_millis(5_000));
    }

    #[test]
    fn test_empty_secret_rejected() {
        let config = Config::from_toml("[auth]\njwt_secret = \"\"\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_ttl_bounds_enforced() {
        for ttl in [0, -1, MAX_TOKEN_TTL_SECS + 1] {
            let mut config = Config::default();
            config.auth.jwt_secret = Some("0123456789abcdef0123456789abcdef".to_string());
            config.auth.token_ttl_secs = ttl;
            assert!(config.validate().is_err(), "ttl {} should be rejected", ttl);
        }
    }

    #[test]
    fn test_clock_skew_bounded() {
        let mut config = Config::from_toml(
            "[auth]\njwt_secret = \"0123456789abcdef0123456789abcdef\"\nclock_skew_secs = 31536000\n",
        )
        .unwrap();
        assert!(config.validate().is_err());

        config.auth.clock_skew_secs = MAX_CLOCK_SKEW_SECS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_secret_never_serialized() {
        let mut config = Config::default();
        config.auth.jwt_secret = Some("super-secret-value".to_string());
        let rendered = toml::to_string(&config).unwrap();
        assert!(!rendered.contains("super-secret-value"));
    }
}
