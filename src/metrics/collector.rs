// src/metrics/collector.rs
use anyhow::Result;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::Duration;

use crate::health::HealthCheckOutcome;

pub struct MetricsRegistry {
    registry: Registry,
    collector: Arc<MetricsCollector>,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let collector = Arc::new(MetricsCollector::new(&registry)?);

        Ok(Self {
            registry,
            collector,
        })
    }

    pub fn collector(&self) -> Arc<MetricsCollector> {
        self.collector.clone()
    }

    pub fn gather(&self) -> Result<Vec<u8>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(buffer)
    }
}

pub struct MetricsCollector {
    pub http_requests_total: IntCounterVec,
    pub health_checks_total: IntCounterVec,
    pub health_check_duration_seconds: HistogramVec,
    pub last_successful_check_timestamp: IntGauge,
}

impl MetricsCollector {
    pub fn new(registry: &Registry) -> Result<Self> {
        let http_requests_total = IntCounterVec::new(
            Opts::new("hello_http_requests_total", "Requests served, by route"),
            &["route"],
        )?;
        registry.register(Box::new(http_requests_total.clone()))?;

        let health_checks_total = IntCounterVec::new(
            Opts::new("hello_health_checks_total", "Scheduled health checks, by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(health_checks_total.clone()))?;

        let health_check_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "hello_health_check_duration_seconds",
                "Health check duration in seconds",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(health_check_duration_seconds.clone()))?;

        let last_successful_check_timestamp = IntGauge::new(
            "hello_health_check_last_success_timestamp_seconds",
            "Unix time of the last successful health check",
        )?;
        registry.register(Box::new(last_successful_check_timestamp.clone()))?;

        Ok(Self {
            http_requests_total,
            health_checks_total,
            health_check_duration_seconds,
            last_successful_check_timestamp,
        })
    }

    pub fn record_request(&self, route: &str) {
        self.http_requests_total.with_label_values(&[route]).inc();
    }

    pub fn record_health_check(&self, outcome: &HealthCheckOutcome, duration: Duration) {
        let label = outcome.label();
        self.health_checks_total.with_label_values(&[label]).inc();
        self.health_check_duration_seconds
            .with_label_values(&[label])
            .observe(duration.as_secs_f64());

        if let HealthCheckOutcome::Healthy { checked_at } = outcome {
            self.last_successful_check_timestamp
                .set(checked_at.timestamp());
        }
    }
}
