//! Application state management for the service.
//!
//! This module defines the shared application state that is passed
//! to HTTP handlers.

use diskio_healthcheck::HealthAggregator;
use prometheus::Registry;
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::metrics::HealthMetrics;

/// Type alias for shared application state.
pub type SharedState = Arc<AppState>;

/// Global application state shared across requests.
pub struct AppState {
    pub registry: Registry,
    pub metrics: HealthMetrics,
    /// Health checks backing `/health`; started once at boot.
    pub aggregator: Arc<HealthAggregator>,
    pub config: Arc<Config>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}
