//! Prometheus metrics endpoint
//!
//! Served outside the token guard so scrapers need no credentials; bind it
//! to an internal interface in deployments that care.

use axum::{
    Router,
    extract::State,
    http::header::CONTENT_TYPE,
    response::IntoResponse,
    routing::get,
};
use std::sync::Arc;

use crate::state::MetricsHandle;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Create metrics routes with the Prometheus handle
pub fn routes(handle: Arc<MetricsHandle>) -> Router {
    Router::new()
        .route("/metrics", get(get_metrics))
        .with_state(handle)
}

/// GET /metrics - login and token rejection counters
async fn get_metrics(State(handle): State<Arc<MetricsHandle>>) -> impl IntoResponse {
    ([(CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], handle.render())
}
