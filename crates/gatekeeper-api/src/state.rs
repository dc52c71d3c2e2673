//! Application state

use gatekeeper_auth::Authenticator;
use gatekeeper_db::Database;
use std::sync::Arc;

/// Prometheus recorder handle used to render `/metrics`
pub type MetricsHandle = metrics_exporter_prometheus::PrometheusHandle;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub auth: Arc<Authenticator>,
}

impl AppState {
    pub fn new(db: Database, auth: Arc<Authenticator>) -> Self {
        Self { db, auth }
    }
}
