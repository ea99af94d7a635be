//! Configuration types for the health checks.
//!
//! Each check receives its own configuration struct at construction. The
//! structs deserialize from the config file with per-field defaults, so a
//! partial section only overrides what it names.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::collectors::diskstats::DEFAULT_DISKSTATS_PATH;

/// Configuration of a disk I/O check.
///
/// `interval_seconds` drives both the diskstats poll and the evaluation of
/// the check. Rates are always computed against the poll interval, so the
/// two cannot drift apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiskCheckConfig {
    /// Device to watch, e.g. `/dev/sda` or `/dev/disk/by-label/storage`.
    pub device: String,
    /// Location of the kernel counter source.
    pub diskstats_path: PathBuf,
    /// Seconds between polls of the counter source.
    pub interval_seconds: u64,
    /// Number of samples in each moving average.
    pub average_count: usize,
    /// Max averaged read KB/s to consider healthy (0 = unconstrained).
    pub max_read_kbs: u64,
    /// Max averaged write KB/s to consider healthy (0 = unconstrained).
    pub max_write_kbs: u64,
    /// Max averaged read+write KB/s to consider healthy (0 = unconstrained).
    pub max_total_kbs: u64,
}

impl Default for DiskCheckConfig {
    fn default() -> Self {
        Self {
            device: "/dev/sda".to_string(),
            diskstats_path: PathBuf::from(DEFAULT_DISKSTATS_PATH),
            interval_seconds: 1,
            average_count: 5,
            max_read_kbs: 0,
            max_write_kbs: 0,
            max_total_kbs: 0,
        }
    }
}

impl DiskCheckConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

/// Configuration of a pass-through HTTP check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpCheckConfig {
    /// Downstream health endpoint. Empty disables probing; the check then
    /// always reports healthy.
    pub url: String,
    /// Seconds between probes.
    pub interval_seconds: u64,
}

impl Default for HttpCheckConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            interval_seconds: 1,
        }
    }
}

impl HttpCheckConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disk_check_config_default() {
        let config = DiskCheckConfig::default();
        assert_eq!(config.device, "/dev/sda");
        assert_eq!(config.diskstats_path, PathBuf::from("/proc/diskstats"));
        assert_eq!(config.interval(), Duration::from_secs(1));
        assert_eq!(config.average_count, 5);
        assert_eq!(
            (config.max_read_kbs, config.max_write_kbs, config.max_total_kbs),
            (0, 0, 0)
        );
    }

    #[test]
    fn test_http_check_config_default() {
        let config = HttpCheckConfig::default();
        assert!(config.url.is_empty());
        assert_eq!(config.interval_seconds, 1);
    }

    #[test]
    fn test_partial_disk_section() {
        let config: DiskCheckConfig =
            serde_yaml::from_str("device: /dev/nvme0n1\nmax_read_kbs: 2048\n").unwrap();
        assert_eq!(config.device, "/dev/nvme0n1");
        assert_eq!(config.max_read_kbs, 2048);
        assert_eq!(config.average_count, 5);
    }
}
