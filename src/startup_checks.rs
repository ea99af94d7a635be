//! Startup requirement validation for diskio-healthcheck.
//!
//! This module validates that the diskstats source is readable and that the
//! configured device shows up in it before the service starts.

use diskio_healthcheck::collectors::diskstats::read_diskstats;
use diskio_healthcheck::{sanitize_disk_name, DiskCheckConfig, DiskstatsError};
use tracing::{error, info, warn};

/// Validate all runtime requirements
pub fn validate_requirements(disk: &DiskCheckConfig) -> Result<(), ValidationError> {
    info!("🔍 Validating runtime requirements...");

    let devices = check_diskstats_access(disk)?;
    check_device_present(disk, &devices);

    info!("✅ All runtime requirements validated");
    Ok(())
}

/// Check that the diskstats source can be read and parsed
fn check_diskstats_access(disk: &DiskCheckConfig) -> Result<Vec<String>, ValidationError> {
    match read_diskstats(&disk.diskstats_path) {
        Ok(stats) => {
            info!(
                "✅ {} readable: {} devices",
                disk.diskstats_path.display(),
                stats.len()
            );
            Ok(stats.into_keys().collect())
        }
        Err(DiskstatsError::Io { path, source }) => {
            error!("❌ Cannot read {}: {}", path.display(), source);
            Err(ValidationError::DiskstatsUnreadable(format!(
                "{}: {}",
                path.display(),
                source
            )))
        }
        Err(e) => {
            error!("❌ {}", e);
            Err(ValidationError::DiskstatsMalformed(e.to_string()))
        }
    }
}

/// Warn if the configured device is not listed. Not fatal: the device may be
/// attached later, and the disk check reports "not ready" until it is.
fn check_device_present(disk: &DiskCheckConfig, devices: &[String]) -> bool {
    let name = sanitize_disk_name(&disk.device);
    if devices.iter().any(|d| *d == name) {
        info!("✅ Device {} found as '{}'", disk.device, name);
        true
    } else {
        warn!(
            "⚠️  Device {} (resolved to '{}') not found in {}",
            disk.device,
            name,
            disk.diskstats_path.display()
        );
        warn!("   The disk check will report 'not ready' until it appears");
        false
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Diskstats source not readable: {0}")]
    DiskstatsUnreadable(String),

    #[error("Diskstats source malformed: {0}")]
    DiskstatsMalformed(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config_for(file: &NamedTempFile, device: &str) -> DiskCheckConfig {
        DiskCheckConfig {
            device: device.to_string(),
            diskstats_path: file.path().to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_source() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "8 0 sda 1 0 1 0 1 0 1 0 0 0 0").unwrap();
        assert!(validate_requirements(&config_for(&file, "/dev/sda")).is_ok());
    }

    #[test]
    fn test_missing_device_is_not_fatal() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "8 0 sda 1 0 1 0 1 0 1 0 0 0 0").unwrap();
        let config = config_for(&file, "/dev/notthere9");
        assert!(!check_device_present(&config, &["sda".to_string()]));
        assert!(validate_requirements(&config).is_ok());
    }

    #[test]
    fn test_malformed_source() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "8 0 sda 1 0").unwrap();
        assert!(matches!(
            validate_requirements(&config_for(&file, "sda")),
            Err(ValidationError::DiskstatsMalformed(_))
        ));
    }

    #[test]
    fn test_unreadable_source() {
        let config = DiskCheckConfig {
            diskstats_path: "/nonexistent/diskstats".into(),
            ..Default::default()
        };
        assert!(matches!(
            validate_requirements(&config),
            Err(ValidationError::DiskstatsUnreadable(_))
        ));
    }
}
