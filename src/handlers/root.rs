//! Root endpoint handler.
//!
//! Lists the available endpoints together with version and uptime.

use axum::{extract::State, response::IntoResponse};
use tracing::{debug, instrument};

use crate::state::SharedState;

/// Handler for the root `/` endpoint.
#[instrument(skip(state))]
pub async fn root_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing / request");

    let version = env!("CARGO_PKG_VERSION");
    let uptime_secs = state.start_time.elapsed().as_secs();
    let uptime_str = format!(
        "{}h {}m {}s",
        uptime_secs / 3600,
        (uptime_secs % 3600) / 60,
        uptime_secs % 60
    );

    let mut endpoints = String::new();
    endpoints.push_str("  /health       200 if all checks pass, 503 otherwise (plain text)\n");
    endpoints.push_str("  /health/json  Same verdict as JSON\n");
    if state.config.enable_metrics.unwrap_or(true) {
        endpoints.push_str("  /metrics      Prometheus metrics\n");
    }

    let checks: String = state
        .aggregator
        .checks()
        .iter()
        .map(|check| format!("  {}\n", check.name()))
        .collect();

    format!(
        "diskio-healthcheck {version}\nUptime: {uptime_str}\n\nEndpoints:\n{endpoints}\nChecks:\n{checks}"
    )
}
