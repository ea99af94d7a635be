//! CLI arguments and subcommands for diskio-healthcheck.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use tracing::level_filters::LevelFilter;
use std::net::IpAddr;
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Maximum level passed to the subscriber. `Off` silences all output.
    pub fn as_filter(&self) -> LevelFilter {
        match self {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Configuration format options for output
#[derive(Debug, Clone, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "diskio-healthcheck",
    about = "Health check endpoint driven by block device throughput",
    long_about = "Health check endpoint driven by block device throughput.\n\n\
                  Samples /proc/diskstats for one device, averages read/write/total KB/s \
                  over a sliding window and answers /health with 503 while any configured \
                  ceiling is exceeded. Optionally chains a downstream HTTP health endpoint.",
    version,
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// HTTP listen port
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Bind to specific interface/IP
    #[arg(long)]
    pub bind: Option<IpAddr>,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,

    /// Path of device to watch
    #[arg(long)]
    pub disk_device: Option<String>,

    /// Seconds between reading /proc/diskstats
    #[arg(long)]
    pub disk_interval: Option<u64>,

    /// Number of datapoints to average out
    #[arg(long)]
    pub disk_average: Option<usize>,

    /// Max read KB/s to consider healthy (0 = unconstrained)
    #[arg(long)]
    pub disk_read: Option<u64>,

    /// Max write KB/s to consider healthy (0 = unconstrained)
    #[arg(long)]
    pub disk_write: Option<u64>,

    /// Max total KB/s to consider healthy (0 = unconstrained)
    #[arg(long)]
    pub disk_total: Option<u64>,

    /// Alternative diskstats source (defaults to /proc/diskstats)
    #[arg(long)]
    pub diskstats_path: Option<PathBuf>,

    /// Proxy another http healthcheck
    #[arg(long)]
    pub next_url: Option<String>,

    /// Seconds between checking the other url
    #[arg(long)]
    pub next_interval: Option<u64>,

    /// Disable the /metrics endpoint
    #[arg(long)]
    pub disable_metrics: bool,

    /// Enable TLS/SSL for HTTPS
    #[arg(long)]
    pub enable_tls: bool,

    /// Path to TLS certificate file (PEM format)
    #[arg(long)]
    pub tls_cert: Option<PathBuf>,

    /// Path to TLS private key file (PEM format)
    #[arg(long)]
    pub tls_key: Option<PathBuf>,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check runtime requirements (diskstats access, device presence)
    CheckRequirements,
}
