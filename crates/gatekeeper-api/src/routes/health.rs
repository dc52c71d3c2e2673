//! Liveness and readiness endpoints
//!
//! `/healthz` only proves the process is serving. `/health` also probes the
//! credential store, since logins cannot succeed without it.

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::Serialize;
use tracing::warn;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<&'static str>,
}

async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        store: None,
    })
}

async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let store_ok = match state.db.ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!("Credential store probe failed: {}", e);
            false
        }
    };
    metrics::counter!(
        "gatekeeper_health_checks_total",
        "store" => if store_ok { "up" } else { "down" }
    )
    .increment(1);

    let (status, label) = if store_ok {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };
    (
        status,
        Json(HealthResponse {
            status: label,
            version: env!("CARGO_PKG_VERSION"),
            store: Some(if store_ok { "up" } else { "down" }),
        }),
    )
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(readiness))
        .route("/healthz", get(liveness))
}
