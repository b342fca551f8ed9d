// src/config/models.rs
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Base URL used when neither `SERVER_URL` nor the config file provide one.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:9900";

pub const SERVER_URL_ENV: &str = "SERVER_URL";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server_url: Option<String>,

    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    #[serde(default)]
    pub health_check: HealthCheckConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_metrics_port")]
    pub port: u16,

    #[serde(default = "default_metrics_path")]
    pub path: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("health_check.interval_ms must be greater than zero")]
    ZeroInterval,

    #[error("health_check.timeout_ms must be greater than zero")]
    ZeroTimeout,

    #[error("metrics.path must start with '/', got {0:?}")]
    InvalidMetricsPath(String),

    #[error("metrics.port {0} collides with the listen port")]
    MetricsPortInUse(u16),
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 9900))
}

fn default_interval_ms() -> u64 {
    2_000
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_metrics_port() -> u16 {
    9901
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: None,
            listen_addr: default_listen_addr(),
            health_check: HealthCheckConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
            path: default_metrics_path(),
        }
    }
}

impl HealthCheckConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.health_check.interval_ms == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if self.health_check.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.metrics.enabled {
            if !self.metrics.path.starts_with('/') {
                return Err(ConfigError::InvalidMetricsPath(self.metrics.path.clone()));
            }
            if self.metrics.port == self.listen_addr.port() {
                return Err(ConfigError::MetricsPortInUse(self.metrics.port));
            }
        }
        Ok(())
    }

    /// Apply `SERVER_URL` from `lookup`. An empty value counts as unset.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(SERVER_URL_ENV).filter(|v| !v.is_empty()) {
            self.server_url = Some(url);
        }
    }

    /// The base URL the health checker targets, falling back to
    /// [`DEFAULT_SERVER_URL`].
    pub fn server_url(&self) -> &str {
        match self.server_url.as_deref() {
            Some(url) if !url.is_empty() => url,
            _ => DEFAULT_SERVER_URL,
        }
    }

    pub fn uses_default_server_url(&self) -> bool {
        !matches!(self.server_url.as_deref(), Some(url) if !url.is_empty())
    }
}
