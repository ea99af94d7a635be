//! Health check variants.
//!
//! Every check is configured through its fallible constructor, started once
//! with the process-wide cancellation token, and from then on keeps its own
//! verdict current from a background task:
//! - [`DiskCheck`]: moving-average read/write/total throughput of one block device
//! - [`HttpCheck`]: pass-through of a downstream HTTP health endpoint

pub mod disk;
pub mod http;

use async_trait::async_trait;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub use disk::{DiskCheck, DiskRates, Evaluation};
pub use http::HttpCheck;

/// A health check with its own periodic worker(s).
#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// Short identifier used in reports and metric labels.
    fn name(&self) -> &str;

    /// Launches the check's background task(s).
    ///
    /// All tasks stop at their next tick boundary once `cancel` fires.
    fn start(self: Arc<Self>, cancel: CancellationToken) -> Vec<JoinHandle<()>>;

    /// Re-evaluates the check and returns the new verdict.
    async fn update(&self) -> bool;

    /// Verdict of the most recent evaluation.
    fn is_healthy(&self) -> bool;

    /// One-line human readable status.
    fn summary(&self) -> String {
        let status = if self.is_healthy() {
            "healthy"
        } else {
            "unhealthy"
        };
        format!("{} {}", self.name(), status)
    }

    /// Numeric readings behind the verdict, e.g. averaged KB/s.
    fn readings(&self) -> Vec<(&'static str, f64)> {
        Vec::new()
    }
}
