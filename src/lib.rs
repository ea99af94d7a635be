//! Disk I/O Health Check Library
//!
//! This library turns the per-device counters of `/proc/diskstats` into a
//! pass/fail health verdict. It is framework-agnostic: the HTTP layer in the
//! binary only consumes [`HealthAggregator::is_healthy`] and
//! [`HealthAggregator::report`].
//!
//! # Features
//!
//! - **Diskstats Source**: Periodic, atomically committed snapshots and per-device deltas
//! - **Moving Averages**: O(1) windowed smoothing of read/write/total KB/s
//! - **Configurable Ceilings**: Per-axis KB/s limits, 0 meaning unconstrained
//! - **Composable Checks**: Disk I/O and HTTP pass-through checks behind one trait
//! - **Cooperative Cancellation**: Every worker stops at its next tick once the shared token fires
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use diskio_healthcheck::{
//!     DiskCheck, DiskCheckConfig, HealthAggregator, HttpCheck, HttpCheckConfig,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let disk = DiskCheck::configure(DiskCheckConfig {
//!     device: "/dev/sda".to_string(),
//!     max_read_kbs: 10_240,
//!     ..Default::default()
//! })?;
//! let next = HttpCheck::configure(HttpCheckConfig::default())?;
//!
//! let mut aggregator = HealthAggregator::new();
//! aggregator.push(Arc::new(disk));
//! aggregator.push(Arc::new(next));
//! aggregator.start(CancellationToken::new());
//!
//! let response = aggregator.report();
//! println!("Overall status: {}", response.overall_status);
//! for check in &response.checks {
//!     println!("{}", check.summary);
//! }
//! # Ok(())
//! # }
//! ```

pub mod checks;
pub mod collectors;
pub mod device;
pub mod error;
pub mod health;
pub mod health_config;
pub mod moving_average;
mod worker;

// Re-export main types for convenience
pub use checks::{DiskCheck, DiskRates, Evaluation, HealthCheck, HttpCheck};
pub use collectors::diskstats::{Diskstats, Statline};
pub use device::sanitize_disk_name;
pub use error::{CheckError, DiskstatsError};
pub use health::{CheckHealth, HealthAggregator, HealthResponse};
pub use health_config::{DiskCheckConfig, HttpCheckConfig};
pub use moving_average::MovingAverage;
