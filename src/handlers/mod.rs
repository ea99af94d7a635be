//! HTTP endpoint handlers for the service.
//!
//! This module provides handlers for all HTTP endpoints:
//! - `/`: Endpoint listing
//! - `/health`: Plain-text health verdict for liveness/readiness probes
//! - `/health/json`: The same verdict as JSON
//! - `/metrics`: Prometheus metrics endpoint

pub mod health;
pub mod metrics;
pub mod root;

// Re-export handlers
pub use health::{health_handler, health_json_handler};
pub use metrics::metrics_handler;
pub use root::root_handler;
