//! Disk I/O health check.
//!
//! Watches one block device through its own [`Diskstats`] source. Each
//! evaluation turns the latest delta into read/write/total KB/s, feeds those
//! into moving averages and compares the averages against the configured
//! ceilings.
//!
//! Rates are sampled at whole-KB/s resolution: each sample is truncated
//! before it is averaged, and the averages are truncated again when compared.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::HealthCheck;
use crate::collectors::diskstats::Diskstats;
use crate::device::sanitize_disk_name;
use crate::error::CheckError;
use crate::health_config::DiskCheckConfig;
use crate::moving_average::MovingAverage;
use crate::worker::spawn_periodic;

const BYTES_PER_KB: u64 = 1024;

/// Read, write and total throughput in KB/s.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DiskRates {
    pub read_kbs: f64,
    pub write_kbs: f64,
    pub total_kbs: f64,
}

/// Outcome of a single evaluation tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Evaluation {
    /// Not evaluated since the check was configured.
    Pending,
    /// No delta for the device yet. Transient; counts as unhealthy.
    NotReady,
    /// Averages were updated and compared against the ceilings.
    Evaluated { averages: DiskRates, healthy: bool },
}

impl Evaluation {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Evaluation::Evaluated { healthy: true, .. })
    }
}

struct Averages {
    read: MovingAverage,
    write: MovingAverage,
    total: MovingAverage,
}

/// Health check on the throughput of a single block device.
pub struct DiskCheck {
    name: String,
    config: DiskCheckConfig,
    stats: Arc<Diskstats>,
    averages: Mutex<Averages>,
    last: Mutex<Evaluation>,
    healthy: AtomicBool,
}

impl DiskCheck {
    /// Opens the configured diskstats source and takes its first reading.
    ///
    /// Fails if the interval is zero or the source cannot be opened or parsed.
    pub fn configure(config: DiskCheckConfig) -> Result<Self, CheckError> {
        if config.interval_seconds == 0 {
            return Err(CheckError::InvalidInterval);
        }

        let stats = Diskstats::open(&config.diskstats_path, config.interval())?;
        info!(
            "Disk check on {} ({}) configured: interval={}s average={} max_read={}KB/s max_write={}KB/s max_total={}KB/s",
            config.device,
            sanitize_disk_name(&config.device),
            config.interval_seconds,
            config.average_count,
            config.max_read_kbs,
            config.max_write_kbs,
            config.max_total_kbs
        );
        stats.log_summary();

        let averages = Averages {
            read: MovingAverage::new(config.average_count),
            write: MovingAverage::new(config.average_count),
            total: MovingAverage::new(config.average_count),
        };

        Ok(Self {
            name: format!("disk:{}", config.device),
            config,
            stats: Arc::new(stats),
            averages: Mutex::new(averages),
            last: Mutex::new(Evaluation::Pending),
            healthy: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &DiskCheckConfig {
        &self.config
    }

    /// The diskstats source owned by this check.
    pub fn diskstats(&self) -> &Arc<Diskstats> {
        &self.stats
    }

    /// Outcome of the most recent evaluation.
    pub fn last_evaluation(&self) -> Evaluation {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs one evaluation tick against the latest delta.
    pub fn evaluate(&self) -> Evaluation {
        let evaluation = match self.stats.get_delta(&self.config.device) {
            None => {
                debug!(
                    "Could not get delta for {} ({}). Might just need to wait for more data",
                    self.config.device,
                    sanitize_disk_name(&self.config.device)
                );
                Evaluation::NotReady
            }
            Some(delta) => {
                // Deltas span one poll interval, never the evaluation period.
                let seconds = self.stats.interval().as_secs_f64();
                let (read_bytes, write_bytes) = delta.rate();
                let read_kbs = whole_kbs_per_second(read_bytes, seconds);
                let write_kbs = whole_kbs_per_second(write_bytes, seconds);

                let averages = {
                    let mut avg = self.averages.lock().unwrap_or_else(PoisonError::into_inner);
                    DiskRates {
                        read_kbs: avg.read.update(read_kbs),
                        write_kbs: avg.write.update(write_kbs),
                        total_kbs: avg.total.update(read_kbs + write_kbs),
                    }
                };
                let healthy = within_limits(&self.config, &averages);

                debug!(
                    "{}: healthy={} read {}KB/s write {}KB/s",
                    self.name, healthy, averages.read_kbs as u64, averages.write_kbs as u64
                );
                Evaluation::Evaluated { averages, healthy }
            }
        };

        self.healthy.store(evaluation.is_healthy(), Ordering::Relaxed);
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = evaluation;
        evaluation
    }
}

/// Converts bytes moved during one interval into whole KB/s.
///
/// Both the byte count and the rate are truncated, so samples enter the
/// moving averages as whole numbers and the total is the sum of the
/// truncated read and write rates.
fn whole_kbs_per_second(bytes: u64, seconds: f64) -> f64 {
    ((bytes / BYTES_PER_KB) as f64 / seconds).trunc()
}

/// Checks averaged rates against the ceilings of `config`.
///
/// A ceiling of 0 leaves its axis unconstrained. Averages are compared at
/// whole-KB/s resolution.
fn within_limits(config: &DiskCheckConfig, averages: &DiskRates) -> bool {
    let exceeds = |max: u64, value: f64| max > 0 && value as u64 > max;

    !(exceeds(config.max_read_kbs, averages.read_kbs)
        || exceeds(config.max_write_kbs, averages.write_kbs)
        || exceeds(config.max_total_kbs, averages.total_kbs))
}

#[async_trait]
impl HealthCheck for DiskCheck {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(self: Arc<Self>, cancel: CancellationToken) -> Vec<JoinHandle<()>> {
        let poller = self.stats.start_worker(cancel.clone());

        let check = Arc::clone(&self);
        let evaluator = spawn_periodic("disk-check", self.stats.interval(), cancel, move || {
            let check = Arc::clone(&check);
            async move {
                check.update().await;
            }
        });

        vec![poller, evaluator]
    }

    async fn update(&self) -> bool {
        self.evaluate().is_healthy()
    }

    fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    fn summary(&self) -> String {
        match self.last_evaluation() {
            Evaluation::Pending | Evaluation::NotReady => format!("{} not ready", self.name),
            Evaluation::Evaluated { averages, healthy } => format!(
                "{} {} read {}KB/s write {}KB/s",
                self.name,
                if healthy { "healthy" } else { "unhealthy" },
                averages.read_kbs as u64,
                averages.write_kbs as u64
            ),
        }
    }

    fn readings(&self) -> Vec<(&'static str, f64)> {
        match self.last_evaluation() {
            Evaluation::Evaluated { averages, .. } => vec![
                ("read_kbs", averages.read_kbs),
                ("write_kbs", averages.write_kbs),
                ("total_kbs", averages.total_kbs),
            ],
            _ => Vec::new(),
        }
    }
}
