// src/main.rs
use anyhow::{Context, Result};
use std::net::SocketAddr;
use tokio::signal;
use tracing::info;

use hello_health::{
    config,
    health::{HttpHealthCheck, Scheduler},
    metrics::{start_metrics_server, MetricsRegistry},
    server::{RequestHandler, ServerBuilder},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("hello_health=info".parse()?)
                .add_directive("hyper=info".parse()?),
        )
        .init();

    // Optional config file, then SERVER_URL
    let config_path = std::env::args().nth(1);
    let config = config::resolve(config_path.as_deref()).await?;

    let metrics_registry = MetricsRegistry::new()?;
    let metrics = metrics_registry.collector();

    // Registration failure is fatal.
    let probe = HttpHealthCheck::new(config.server_url(), config.health_check.timeout())?;
    let scheduler = Scheduler::new(probe, config.health_check.interval())
        .context("Failed to schedule health check")?
        .with_metrics(metrics.clone())
        .start();

    if config.metrics.enabled {
        let metrics_addr = SocketAddr::new(config.listen_addr.ip(), config.metrics.port);
        start_metrics_server(metrics_addr, metrics_registry, config.metrics.path.clone()).await?;
    }

    let handler = RequestHandler::new().with_metrics(metrics);

    ServerBuilder::new(config.listen_addr)
        .with_handler(handler)
        .bind()
        .await?
        .serve_with_shutdown(shutdown_signal())
        .await?;

    scheduler.stop().await;
    info!("Shutdown complete");

    Ok(())
}

// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
