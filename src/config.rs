//! Configuration management for diskio-healthcheck.
//!
//! This module handles loading, merging, and validating configuration from files
//! and CLI arguments. It supports YAML, JSON, and TOML formats.

use crate::cli::{Args, ConfigFormat};
use diskio_healthcheck::{DiskCheckConfig, HttpCheckConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

// Default configuration constants
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8010;

/// Effective configuration of the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub port: Option<u16>,
    pub bind: Option<String>,

    // Feature flags
    #[serde(alias = "enable-metrics")]
    pub enable_metrics: Option<bool>,

    // TLS/SSL Configuration
    #[serde(alias = "enable-tls")]
    pub enable_tls: Option<bool>,
    #[serde(alias = "tls-cert-path")]
    pub tls_cert_path: Option<String>,
    #[serde(alias = "tls-key-path")]
    pub tls_key_path: Option<String>,

    /// Disk I/O check
    #[serde(default)]
    pub disk: DiskCheckConfig,

    /// Downstream HTTP check
    #[serde(default)]
    pub next: HttpCheckConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: Some(DEFAULT_BIND_ADDR.to_string()),
            port: Some(DEFAULT_PORT),
            enable_metrics: Some(true),
            enable_tls: Some(false),
            tls_cert_path: None,
            tls_key_path: None,
            disk: DiskCheckConfig::default(),
            next: HttpCheckConfig::default(),
        }
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    if cfg.port == Some(0) {
        return Err("port must be greater than zero".into());
    }

    if cfg.disk.interval_seconds == 0 {
        return Err("disk.interval_seconds must be greater than zero".into());
    }

    if cfg.disk.device.trim().is_empty() {
        return Err("disk.device must not be empty".into());
    }

    if !cfg.next.url.is_empty() {
        if cfg.next.interval_seconds == 0 {
            return Err("next.interval_seconds must be greater than zero".into());
        }
        let url = url::Url::parse(&cfg.next.url)
            .map_err(|e| format!("Invalid next.url '{}': {}", cfg.next.url, e))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(format!(
                "Invalid next.url '{}': scheme must be http or https",
                cfg.next.url
            )
            .into());
        }
    }

    // TLS validation
    if cfg.enable_tls.unwrap_or(false) {
        let cert_path = cfg.tls_cert_path.as_deref();
        let key_path = cfg.tls_key_path.as_deref();

        match (cert_path, key_path) {
            (None, None) => {
                return Err(
                    "TLS is enabled but neither tls_cert_path nor tls_key_path are set".into(),
                );
            }
            (Some(_), None) => {
                return Err("TLS is enabled but tls_key_path is not set".into());
            }
            (None, Some(_)) => {
                return Err("TLS is enabled but tls_cert_path is not set".into());
            }
            (Some(cert), Some(key)) => {
                check_pem_file(cert, "certificate")?;
                check_pem_file(key, "private key")?;
            }
        }
    }

    Ok(())
}

fn check_pem_file(path: &str, what: &str) -> Result<(), Box<dyn std::error::Error>> {
    match fs::metadata(path) {
        Ok(meta) if meta.len() == 0 => Err(format!("TLS {} file is empty: {}", what, path).into()),
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(format!("TLS {} file not found: {}", what, path).into())
        }
        Err(e) => Err(format!("TLS {} file is not readable: {} ({})", what, path, e).into()),
    }
}

/// Resolves configuration from CLI args, config file, and defaults.
/// This enforces precedence: CLI (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    if let Some(bind_ip) = args.bind {
        config.bind = Some(bind_ip.to_string());
    }
    if let Some(cli_port) = args.port {
        config.port = Some(cli_port);
    }
    if args.disable_metrics {
        config.enable_metrics = Some(false);
    }

    // Disk check
    if let Some(device) = &args.disk_device {
        config.disk.device = device.clone();
    }
    if let Some(interval) = args.disk_interval {
        config.disk.interval_seconds = interval;
    }
    if let Some(count) = args.disk_average {
        config.disk.average_count = count;
    }
    if let Some(max) = args.disk_read {
        config.disk.max_read_kbs = max;
    }
    if let Some(max) = args.disk_write {
        config.disk.max_write_kbs = max;
    }
    if let Some(max) = args.disk_total {
        config.disk.max_total_kbs = max;
    }
    if let Some(path) = &args.diskstats_path {
        config.disk.diskstats_path = path.clone();
    }

    // Downstream check
    if let Some(url) = &args.next_url {
        config.next.url = url.clone();
    }
    if let Some(interval) = args.next_interval {
        config.next.interval_seconds = interval;
    }

    // TLS configuration: CLI wins if provided
    if args.enable_tls {
        config.enable_tls = Some(true);
    }
    if let Some(cert_path) = &args.tls_cert {
        config.tls_cert_path = Some(cert_path.to_string_lossy().to_string());
    }
    if let Some(key_path) = &args.tls_key {
        config.tls_key_path = Some(key_path.to_string_lossy().to_string());
    }

    Ok(config)
}

/// Loads the config file at `path`, or the first one found in the default
/// locations. Falls back to defaults when there is none.
pub fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let defaults = [
                "/etc/diskio-healthcheck/config.yaml",
                "/etc/diskio-healthcheck/config.yml",
                "/etc/diskio-healthcheck/config.json",
                "./diskio-healthcheck.yaml",
                "./diskio-healthcheck.yml",
                "./diskio-healthcheck.json",
            ];

            match defaults.iter().find(|p| Path::new(p).exists()) {
                Some(p) => PathBuf::from(p),
                None => return Ok(Config::default()),
            }
        }
    };

    if !path.exists() {
        return Err(format!("Config file not found: {}", path.display()).into());
    }

    let content = fs::read_to_string(&path)?;
    let config = parse_config(&content, path.extension().and_then(|s| s.to_str()))?;
    info!("Loaded configuration from: {}", path.display());
    Ok(config)
}

/// Parses config content; the extension selects the format, YAML otherwise.
fn parse_config(content: &str, extension: Option<&str>) -> Result<Config, Box<dyn std::error::Error>> {
    let config = match extension {
        Some("json") => serde_json::from_str(content)?,
        Some("toml") => toml::from_str(content)?,
        _ => serde_yaml::from_str(content)?,
    };
    Ok(config)
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: ConfigFormat) -> Result<(), Box<dyn std::error::Error>> {
    let output = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    };

    println!("{output}");
    Ok(())
}
