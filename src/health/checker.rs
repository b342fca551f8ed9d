// src/health/checker.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, StatusCode};
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info};

/// Path appended to the base URL to build the probe target.
pub const HEALTH_PATH: &str = "/health";

#[derive(Debug, thiserror::Error)]
pub enum HealthCheckError {
    #[error("health check failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("health check failed: no response within {0:?}")]
    Timeout(Duration),

    #[error("health check returned non-OK status: {0}")]
    UnexpectedStatus(StatusCode),
}

#[derive(Debug)]
pub enum HealthCheckOutcome {
    Healthy { checked_at: DateTime<Utc> },
    Unhealthy(HealthCheckError),
}

impl HealthCheckOutcome {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthCheckOutcome::Healthy { .. })
    }

    /// Metric label for this outcome.
    pub fn label(&self) -> &'static str {
        match self {
            HealthCheckOutcome::Healthy { .. } => "success",
            HealthCheckOutcome::Unhealthy(HealthCheckError::UnexpectedStatus(_)) => "bad_status",
            HealthCheckOutcome::Unhealthy(_) => "transport_error",
        }
    }

    /// Emit the single log line for this outcome.
    pub fn log(&self) {
        match self {
            HealthCheckOutcome::Healthy { checked_at } => info!(
                "Health check successful at {}",
                checked_at.to_rfc3339_opts(SecondsFormat::Secs, true)
            ),
            HealthCheckOutcome::Unhealthy(e) => error!("Error in health check: {}", e),
        }
    }
}

/// One liveness probe. The scheduler calls this once per tick.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn check(&self) -> HealthCheckOutcome;

    fn target(&self) -> &str;
}

/// Build the probe target by appending [`HEALTH_PATH`] to `base_url` as-is.
pub fn health_url(base_url: &str) -> String {
    format!("{}{}", base_url, HEALTH_PATH)
}

/// Probes `<base_url>/health` over HTTP and expects exactly `200 OK`.
pub struct HttpHealthCheck {
    client: Client,
    target: String,
    timeout: Duration,
}

impl HttpHealthCheck {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            target: health_url(base_url),
            timeout,
        })
    }

    async fn fetch_status(&self) -> Result<StatusCode, HealthCheckError> {
        let response = self.client.get(&self.target).send().await?;
        let status = response.status();

        // Release the connection whatever the status was.
        if let Err(e) = response.bytes().await {
            debug!("Failed to drain health check body from {}: {}", self.target, e);
        }

        Ok(status)
    }
}

#[async_trait]
impl HealthProbe for HttpHealthCheck {
    async fn check(&self) -> HealthCheckOutcome {
        let result = match timeout(self.timeout, self.fetch_status()).await {
            Ok(Ok(status)) if status == StatusCode::OK => Ok(()),
            Ok(Ok(status)) => Err(HealthCheckError::UnexpectedStatus(status)),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(HealthCheckError::Timeout(self.timeout)),
        };

        match result {
            Ok(()) => HealthCheckOutcome::Healthy {
                checked_at: Utc::now(),
            },
            Err(e) => HealthCheckOutcome::Unhealthy(e),
        }
    }

    fn target(&self) -> &str {
        &self.target
    }
}
