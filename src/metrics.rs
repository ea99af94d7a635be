//! Prometheus metrics definitions for diskio-healthcheck.
//!
//! Gauges mirror the health report: the overall verdict, each check's verdict
//! and each check's numeric readings (averaged KB/s for disk checks). They are
//! refreshed from the aggregator on every scrape.

use diskio_healthcheck::HealthResponse;
use prometheus::{Gauge, GaugeVec, Opts, Registry};

/// Collection of Prometheus metrics exposed on `/metrics`.
#[derive(Clone)]
pub struct HealthMetrics {
    pub healthy: Gauge,
    pub check_healthy: GaugeVec, // labels: check
    pub check_reading: GaugeVec, // labels: check, reading
    pub scrape_duration: Gauge,
}

impl HealthMetrics {
    /// Creates and registers all Prometheus metrics with the registry.
    pub fn new(registry: &Registry) -> Result<Self, Box<dyn std::error::Error>> {
        let healthy = Gauge::new(
            "diskio_healthcheck_healthy",
            "Whether all health checks pass (1) or not (0)",
        )?;
        let check_healthy = GaugeVec::new(
            Opts::new(
                "diskio_healthcheck_check_healthy",
                "Whether a single health check passes (1) or not (0)",
            ),
            &["check"],
        )?;
        let check_reading = GaugeVec::new(
            Opts::new(
                "diskio_healthcheck_check_reading",
                "Latest numeric reading of a health check (disk checks: averaged KB/s)",
            ),
            &["check", "reading"],
        )?;
        let scrape_duration = Gauge::new(
            "diskio_healthcheck_scrape_duration_seconds",
            "Time spent serving the /metrics request",
        )?;

        registry.register(Box::new(healthy.clone()))?;
        registry.register(Box::new(check_healthy.clone()))?;
        registry.register(Box::new(check_reading.clone()))?;
        registry.register(Box::new(scrape_duration.clone()))?;

        Ok(Self {
            healthy,
            check_healthy,
            check_reading,
            scrape_duration,
        })
    }

    /// Copies a health report into the gauges.
    pub fn observe(&self, report: &HealthResponse) {
        self.healthy.set(if report.healthy { 1.0 } else { 0.0 });

        // Readings disappear while a check is not ready; drop stale series.
        self.check_reading.reset();
        for check in &report.checks {
            self.check_healthy
                .with_label_values(&[check.name.as_str()])
                .set(if check.healthy { 1.0 } else { 0.0 });
            for (reading, value) in &check.readings {
                self.check_reading
                    .with_label_values(&[check.name.as_str(), reading.as_str()])
                    .set(*value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diskio_healthcheck::CheckHealth;
    use std::collections::BTreeMap;

    #[test]
    fn test_observe_report() {
        let registry = Registry::new();
        let metrics = HealthMetrics::new(&registry).unwrap();

        let mut readings = BTreeMap::new();
        readings.insert("read_kbs".to_string(), 42.0);
        let report = HealthResponse {
            checks: vec![CheckHealth {
                name: "disk:/dev/sda".to_string(),
                healthy: false,
                summary: String::new(),
                readings,
            }],
            healthy: false,
            overall_status: "unhealthy".to_string(),
        };
        metrics.observe(&report);

        assert_eq!(metrics.healthy.get(), 0.0);
        assert_eq!(
            metrics
                .check_reading
                .with_label_values(&["disk:/dev/sda", "read_kbs"])
                .get(),
            42.0
        );
        assert_eq!(
            metrics
                .check_healthy
                .with_label_values(&["disk:/dev/sda"])
                .get(),
            0.0
        );
    }
}
