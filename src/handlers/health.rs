//! Health check endpoint handlers.
//!
//! `/health` answers 200 while every check passes and 503 otherwise. The
//! plain-text body carries one line per check, including the averaged
//! read/write KB/s of disk checks.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use diskio_healthcheck::HealthResponse;
use std::fmt::Write as FmtWrite;
use tracing::{debug, instrument};

use crate::state::SharedState;

fn status_code(report: &HealthResponse) -> StatusCode {
    if report.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Handler for the /health endpoint.
#[instrument(skip(state))]
pub async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let report = state.aggregator.report();
    let status = status_code(&report);
    debug!("Health check: {} - {}", status, report.overall_status);

    (
        status,
        [("Content-Type", "text/plain; charset=utf-8")],
        render_report(&report),
    )
}

/// Handler for the /health/json endpoint.
#[instrument(skip(state))]
pub async fn health_json_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let report = state.aggregator.report();
    (status_code(&report), Json(report))
}

/// Renders the report as plain text: overall status, then one line per check.
pub fn render_report(report: &HealthResponse) -> String {
    let mut out = String::new();
    writeln!(out, "{}", report.overall_status).ok();
    for check in &report.checks {
        writeln!(out, "{}", check.summary).ok();
    }
    out
}
