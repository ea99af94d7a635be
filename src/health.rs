//! Aggregation of health checks.
//!
//! The aggregator starts every check it holds and reduces their verdicts with
//! a logical AND. There is no aggregate worker; the verdict is computed on
//! demand from each check's latest state.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use diskio_healthcheck::{DiskCheck, DiskCheckConfig, HealthAggregator};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let disk = DiskCheck::configure(DiskCheckConfig {
//!     device: "/dev/nvme0n1".to_string(),
//!     max_write_kbs: 50_000,
//!     ..Default::default()
//! })?;
//!
//! let mut aggregator = HealthAggregator::new();
//! aggregator.push(Arc::new(disk));
//!
//! let cancel = CancellationToken::new();
//! let handles = aggregator.start(cancel.clone());
//!
//! println!("healthy: {}", aggregator.is_healthy());
//!
//! cancel.cancel();
//! for handle in handles {
//!     handle.await?;
//! }
//! # Ok(())
//! # }
//! ```

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::checks::HealthCheck;

/// Status of a single check.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CheckHealth {
    /// Name of the check (e.g., "disk:/dev/sda").
    pub name: String,
    /// Verdict of the most recent evaluation.
    pub healthy: bool,
    /// One-line human readable status.
    pub summary: String,
    /// Numeric readings behind the verdict.
    pub readings: BTreeMap<String, f64>,
}

/// Health response covering every check.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub checks: Vec<CheckHealth>,
    /// AND of all check verdicts.
    pub healthy: bool,
    /// "ok" or "unhealthy".
    pub overall_status: String,
}

/// Ordered collection of health checks with an AND-reduced verdict.
#[derive(Default)]
pub struct HealthAggregator {
    checks: Vec<Arc<dyn HealthCheck>>,
}

impl HealthAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_checks(checks: Vec<Arc<dyn HealthCheck>>) -> Self {
        Self { checks }
    }

    /// Appends a check; checks are reported in insertion order.
    pub fn push(&mut self, check: Arc<dyn HealthCheck>) {
        self.checks.push(check);
    }

    pub fn checks(&self) -> &[Arc<dyn HealthCheck>] {
        &self.checks
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Starts every check's workers. No ordering between checks is implied.
    pub fn start(&self, cancel: CancellationToken) -> Vec<JoinHandle<()>> {
        let handles: Vec<JoinHandle<()>> = self
            .checks
            .iter()
            .flat_map(|check| Arc::clone(check).start(cancel.clone()))
            .collect();
        info!(
            "Started {} health checks ({} tasks)",
            self.checks.len(),
            handles.len()
        );
        handles
    }

    /// True if every check is healthy. An empty aggregator is healthy.
    pub fn is_healthy(&self) -> bool {
        self.checks.iter().all(|check| check.is_healthy())
    }

    /// Current status of every check plus the overall verdict.
    pub fn report(&self) -> HealthResponse {
        let checks: Vec<CheckHealth> = self
            .checks
            .iter()
            .map(|check| CheckHealth {
                name: check.name().to_string(),
                healthy: check.is_healthy(),
                summary: check.summary(),
                readings: check
                    .readings()
                    .into_iter()
                    .map(|(key, value)| (key.to_string(), value))
                    .collect(),
            })
            .collect();

        let healthy = checks.iter().all(|c| c.healthy);
        HealthResponse {
            checks,
            healthy,
            overall_status: if healthy { "ok" } else { "unhealthy" }.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FixedCheck {
        name: &'static str,
        healthy: AtomicBool,
    }

    impl FixedCheck {
        fn new(name: &'static str, healthy: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                healthy: AtomicBool::new(healthy),
            })
        }
    }

    #[async_trait]
    impl HealthCheck for FixedCheck {
        fn name(&self) -> &str {
            self.name
        }

        fn start(self: Arc<Self>, _cancel: CancellationToken) -> Vec<JoinHandle<()>> {
            Vec::new()
        }

        async fn update(&self) -> bool {
            self.is_healthy()
        }

        fn is_healthy(&self) -> bool {
            self.healthy.load(Ordering::Relaxed)
        }
    }

    #[test]
    fn test_empty_is_healthy() {
        let aggregator = HealthAggregator::new();
        assert!(aggregator.is_empty());
        assert!(aggregator.is_healthy());
        assert_eq!(aggregator.report().overall_status, "ok");
    }

    #[test]
    fn test_and_reduction() {
        let a = FixedCheck::new("a", true);
        let b = FixedCheck::new("b", true);
        let checks: Vec<Arc<dyn HealthCheck>> = vec![a.clone(), b.clone()];
        let aggregator = HealthAggregator::with_checks(checks);
        assert!(aggregator.is_healthy());

        b.healthy.store(false, Ordering::Relaxed);
        assert!(!aggregator.is_healthy());

        b.healthy.store(true, Ordering::Relaxed);
        a.healthy.store(false, Ordering::Relaxed);
        assert!(!aggregator.is_healthy());
    }

    #[test]
    fn test_report_keeps_order() {
        let checks: Vec<Arc<dyn HealthCheck>> = vec![
            FixedCheck::new("first", true),
            FixedCheck::new("second", false),
        ];
        let aggregator = HealthAggregator::with_checks(checks);
        let report = aggregator.report();
        assert_eq!(report.checks.len(), 2);
        assert_eq!(report.checks[0].name, "first");
        assert_eq!(report.checks[1].summary, "second unhealthy");
        assert!(!report.healthy);
        assert_eq!(report.overall_status, "unhealthy");
    }

    #[test]
    fn test_report_serialization() {
        let mut aggregator = HealthAggregator::new();
        aggregator.push(FixedCheck::new("disk", true));
        let json = serde_json::to_string(&aggregator.report()).unwrap();
        assert!(json.contains("\"overall_status\":\"ok\""));
        assert!(json.contains("\"name\":\"disk\""));
    }
}
