//! diskio-healthcheck - version 0.1.0
//!
//! Health check endpoint driven by block device throughput.
//! This is the main entry point that initializes the checks, the HTTP server
//! and handles subcommands.

mod cli;
mod config;
mod handlers;
mod metrics;
mod startup_checks;
mod state;

use axum::{routing::get, Router};
use axum_server::tls_rustls::RustlsConfig;
use clap::Parser;
use diskio_healthcheck::{DiskCheck, HealthAggregator, HealthCheck, HttpCheck};
use prometheus::Registry;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::{net::TcpListener, signal};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use cli::{Args, Commands};
use config::{resolve_config, show_config, validate_effective_config, Config, DEFAULT_BIND_ADDR, DEFAULT_PORT};
use handlers::{health_handler, health_json_handler, metrics_handler, root_handler};
use metrics::HealthMetrics;
use state::{AppState, SharedState};

/// Initializes tracing logging subsystem with configured log level.
fn setup_logging(args: &Args) {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(args.log_level.as_filter())
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    info!("Logging initialized with level: {:?}", args.log_level);
}

/// Helper function to load and validate configuration.
/// Exits the process with error code 1 if validation fails.
fn load_validated_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let config = resolve_config(args)?;
    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }
    Ok(config)
}

/// Builds the configured checks. Order is disk first, then downstream HTTP.
fn build_checks(config: &Config) -> anyhow::Result<HealthAggregator> {
    let disk = DiskCheck::configure(config.disk.clone())?;
    let next = HttpCheck::configure(config.next.clone())?;

    let checks: Vec<Arc<dyn HealthCheck>> = vec![Arc::new(disk), Arc::new(next)];
    Ok(HealthAggregator::with_checks(checks))
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }
}

/// Main application entry point.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Early config resolution for show/check modes
    if args.show_config || args.check_config {
        let config = resolve_config(&args)?;

        if args.check_config {
            if let Err(e) = validate_effective_config(&config) {
                eprintln!("❌ Configuration invalid: {}", e);
                std::process::exit(1);
            }
            println!("✅ Configuration is valid");
            return Ok(());
        }

        return show_config(&config, args.config_format);
    }

    // Before config loading, so the config file location is logged
    setup_logging(&args);
    let config = load_validated_config(&args)?;

    if let Some(Commands::CheckRequirements) = &args.command {
        return match startup_checks::validate_requirements(&config.disk) {
            Ok(()) => {
                println!("\n✅ All requirements met");
                Ok(())
            }
            Err(e) => {
                eprintln!("\n❌ Requirements check failed: {}", e);
                std::process::exit(1);
            }
        };
    }

    info!("Starting diskio-healthcheck");

    if let Err(e) = startup_checks::validate_requirements(&config.disk) {
        error!("❌ Startup validation failed: {}", e);
    }

    let aggregator = match build_checks(&config) {
        Ok(aggregator) => Arc::new(aggregator),
        Err(e) => {
            error!("❌ Failed to configure health checks: {}", e);
            return Err(e.into());
        }
    };

    let cancel = CancellationToken::new();
    let workers = aggregator.start(cancel.clone());

    let registry = Registry::new();
    let metrics = HealthMetrics::new(&registry)?;
    debug!("Prometheus registry initialized");

    let state: SharedState = Arc::new(AppState {
        registry,
        metrics,
        aggregator,
        config: Arc::new(config.clone()),
        start_time: Instant::now(),
    });

    let bind_ip_str = config.bind.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
    let port = config.port.unwrap_or(DEFAULT_PORT);
    let addr: SocketAddr = format!("{}:{}", bind_ip_str, port).parse()?;

    let mut app = Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/health/json", get(health_json_handler));

    if config.enable_metrics.unwrap_or(true) {
        app = app.route("/metrics", get(metrics_handler));
    }

    let app = app.with_state(state);

    let served: Result<(), Box<dyn std::error::Error>> = if config.enable_tls.unwrap_or(false) {
        // Both paths are checked by validate_effective_config()
        let (Some(cert_path), Some(key_path)) =
            (config.tls_cert_path.as_ref(), config.tls_key_path.as_ref())
        else {
            return Err("TLS enabled without tls_cert_path/tls_key_path".into());
        };

        // reqwest and axum-server compile in different rustls backends
        if tokio_rustls::rustls::crypto::aws_lc_rs::default_provider()
            .install_default()
            .is_err()
        {
            debug!("rustls crypto provider already installed");
        }

        info!("Loading TLS certificate from: {}", cert_path);
        info!("Loading TLS private key from: {}", key_path);
        let tls_config = RustlsConfig::from_pem_file(cert_path, key_path).await?;

        info!("diskio-healthcheck listening on https://{}:{}", bind_ip_str, port);
        let server = axum_server::bind_rustls(addr, tls_config).serve(app.into_make_service());

        tokio::select! {
            result = server => result.map_err(Into::into),
            _ = shutdown_signal() => Ok(()),
        }
    } else {
        let listener = TcpListener::bind(addr).await?;
        info!("diskio-healthcheck listening on http://{}:{}", bind_ip_str, port);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(Into::into)
    };

    if let Err(e) = &served {
        error!("Server error: {}", e);
    }

    // Workers stop at their next tick boundary
    cancel.cancel();
    for worker in workers {
        if let Err(e) = worker.await {
            error!("Health check worker failed: {}", e);
        }
    }

    info!("diskio-healthcheck stopped gracefully");
    served
}
