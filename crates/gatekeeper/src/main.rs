//! Gatekeeper - credential authentication and token issuance service

use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod config;

use config::{Config, LoggingConfig};
use gatekeeper_api::{AppState, create_router};
use gatekeeper_auth::{Authenticator, JwtManager, PasswordManager};
use gatekeeper_db::{AccountRole, Database, NewAccount};

/// Gatekeeper - login, token issuance and request guarding
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "GATEKEEPER_CONFIG", default_value = "config/gatekeeper.toml")]
    config: String,

    /// Bind address
    #[arg(long, env = "GATEKEEPER_BIND")]
    bind: Option<String>,

    /// Port
    #[arg(short, long, env = "GATEKEEPER_PORT")]
    port: Option<u16>,

    /// Token signing secret (overrides the config file)
    #[arg(long, env = "GATEKEEPER_JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,

    /// Password for the first admin account, used only when no accounts exist
    #[arg(long, env = "GATEKEEPER_BOOTSTRAP_ADMIN_PASSWORD", hide_env_values = true)]
    bootstrap_admin_password: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration
    let mut config = Config::load(&args.config)?;
    if let Some(secret) = args.jwt_secret {
        config.auth.jwt_secret = Some(secret);
    }

    // Initialize logging
    init_logging(&config.logging);

    config.validate()?;

    info!("Starting Gatekeeper v{}", env!("CARGO_PKG_VERSION"));

    // Initialize database
    if let Some(parent) = Path::new(&config.database.path).parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create database directory {:?}", parent))?;
    }
    let db_url = format!("sqlite:{}?mode=rwc", config.database.path);
    let db = Database::new(&db_url).await?;

    // Initialize authentication core
    let passwords = PasswordManager::new(config.auth.work_factor)?;
    let jwt = Arc::new(JwtManager::new(
        config.auth.secret()?,
        config.auth.clock_skew_secs,
    )?);
    let auth = Arc::new(Authenticator::new(
        Arc::new(db.clone()),
        passwords,
        jwt,
        config.auth.settings(),
    )?);

    bootstrap_admin(
        &db,
        &auth,
        &config.bootstrap.admin_login_key,
        args.bootstrap_admin_password.as_deref(),
    )
    .await?;

    // Install metrics recorder
    let metrics_handle = if config.metrics.enabled {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        Some(Arc::new(handle))
    } else {
        None
    };

    // Create router
    let state = AppState::new(db, auth);
    let app = create_router(state, metrics_handle).layer(TraceLayer::new_for_http());

    // Determine bind address
    let bind_addr = args.bind.unwrap_or(config.server.bind_address);
    let port = args.port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", bind_addr, port).parse()?;

    info!("Listening on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Create the first admin account when the store is empty
async fn bootstrap_admin(
    db: &Database,
    auth: &Authenticator,
    login_key: &str,
    password: Option<&str>,
) -> Result<()> {
    if db.has_accounts().await? {
        return Ok(());
    }

    let Some(password) = password.filter(|p| !p.is_empty()) else {
        warn!(
            "No accounts exist; set GATEKEEPER_BOOTSTRAP_ADMIN_PASSWORD to create admin '{}'",
            login_key
        );
        return Ok(());
    };

    info!("Creating bootstrap admin account");
    let password_hash = auth.hash_password(password).await?;
    let account = db
        .insert_account(NewAccount {
            login_key: login_key.to_string(),
            password_hash,
            role: AccountRole::Admin,
            display_name: Some("Administrator".to_string()),
        })
        .await?;
    info!("Bootstrap admin created (login key: {})", account.login_key);
    Ok(())
}

/// Initialize logging
fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
