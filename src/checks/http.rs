//! Pass-through HTTP health check.
//!
//! Proxies the verdict of another HTTP health endpoint, e.g. the service the
//! disk is attached to. Self-signed certificates are accepted and proxy
//! environment variables are ignored.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use super::HealthCheck;
use crate::error::CheckError;
use crate::health_config::HttpCheckConfig;
use crate::worker::spawn_periodic;

/// Health check that polls a downstream URL.
pub struct HttpCheck {
    name: String,
    config: HttpCheckConfig,
    /// `None` when no URL is configured.
    client: Option<reqwest::Client>,
    healthy: AtomicBool,
    last_status: Mutex<String>,
}

impl HttpCheck {
    /// Validates the URL and builds the HTTP client.
    ///
    /// With an empty URL the check is a constant pass.
    pub fn configure(config: HttpCheckConfig) -> Result<Self, CheckError> {
        if config.url.is_empty() {
            debug!("No downstream URL configured, HTTP check always passes");
            return Ok(Self {
                name: "http".to_string(),
                config,
                client: None,
                healthy: AtomicBool::new(true),
                last_status: Mutex::new("disabled".to_string()),
            });
        }

        if config.interval_seconds == 0 {
            return Err(CheckError::InvalidInterval);
        }

        let url = Url::parse(&config.url).map_err(|e| CheckError::InvalidUrl {
            url: config.url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(CheckError::InvalidUrl {
                url: config.url.clone(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        // Downstream endpoints are local; proxy variables must not reroute them.
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .no_proxy()
            .build()?;

        info!(
            "HTTP check on {} configured: interval={}s",
            config.url, config.interval_seconds
        );

        Ok(Self {
            name: format!("http:{}", config.url),
            config,
            client: Some(client),
            healthy: AtomicBool::new(false),
            last_status: Mutex::new("not probed yet".to_string()),
        })
    }

    pub fn config(&self) -> &HttpCheckConfig {
        &self.config
    }

    fn record(&self, healthy: bool, status: String) {
        self.healthy.store(healthy, Ordering::Relaxed);
        *self
            .last_status
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = status;
    }
}

#[async_trait]
impl HealthCheck for HttpCheck {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(self: Arc<Self>, cancel: CancellationToken) -> Vec<JoinHandle<()>> {
        if self.client.is_none() {
            return Vec::new();
        }

        let check = Arc::clone(&self);
        let probe = spawn_periodic("http-check", self.config.interval(), cancel, move || {
            let check = Arc::clone(&check);
            async move {
                check.update().await;
            }
        });

        vec![probe]
    }

    async fn update(&self) -> bool {
        let Some(client) = &self.client else {
            return true;
        };

        match client.get(&self.config.url).send().await {
            Ok(response) => {
                let status = response.status();
                let healthy = status.is_success();
                if !healthy {
                    debug!("{} returned {}", self.config.url, status);
                }
                self.record(healthy, status.to_string());
                healthy
            }
            Err(e) => {
                warn!("HTTP check on {} failed: {}", self.config.url, e);
                self.record(false, format!("error: {}", e));
                false
            }
        }
    }

    fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    fn summary(&self) -> String {
        let status = self
            .last_status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let verdict = if self.is_healthy() {
            "healthy"
        } else {
            "unhealthy"
        };
        format!("{} {} ({})", self.name, verdict, status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> HttpCheckConfig {
        HttpCheckConfig {
            url: url.to_string(),
            interval_seconds: 1,
        }
    }

    #[tokio::test]
    async fn test_empty_url_always_healthy() {
        let check = Arc::new(HttpCheck::configure(config("")).unwrap());
        assert!(check.is_healthy());
        assert!(check.update().await);
        assert!(check.clone().start(CancellationToken::new()).is_empty());
    }

    #[test]
    fn test_invalid_url_rejected() {
        assert!(matches!(
            HttpCheck::configure(config("not a url")),
            Err(CheckError::InvalidUrl { .. })
        ));
        assert!(matches!(
            HttpCheck::configure(config("ftp://example.com/health")),
            Err(CheckError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = HttpCheckConfig {
            url: "http://127.0.0.1:1/health".to_string(),
            interval_seconds: 0,
        };
        assert!(matches!(
            HttpCheck::configure(config),
            Err(CheckError::InvalidInterval)
        ));
    }

    #[test]
    fn test_unhealthy_until_first_probe() {
        let check = HttpCheck::configure(config("https://127.0.0.1:1/health")).unwrap();
        assert!(!check.is_healthy());
        assert!(check.summary().contains("not probed yet"));
    }

    #[tokio::test]
    async fn test_transport_error_is_unhealthy() {
        // Port 1 on loopback is not expected to accept connections
        let check = HttpCheck::configure(config("http://127.0.0.1:1/health")).unwrap();
        assert!(!check.update().await);
        assert!(!check.is_healthy());
        assert!(check.summary().contains("error"));
    }
}
