// src/config/mod.rs
mod models;

pub use models::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a file (YAML or JSON)
pub async fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    parse_config(path, &contents)
}

fn parse_config(path: &Path, contents: &str) -> Result<Config> {
    let config: Config = match path.extension().and_then(|s| s.to_str()) {
        Some("yaml") | Some("yml") => {
            serde_yaml::from_str(contents).context("Failed to parse YAML config")?
        }
        _ => serde_json::from_str(contents).context("Failed to parse JSON config")?,
    };

    config.validate()?;
    Ok(config)
}

/// Resolve the full configuration: file (if any), then the process environment.
pub async fn resolve<P: AsRef<Path>>(path: Option<P>) -> Result<Config> {
    resolve_with(path, |key| std::env::var(key).ok()).await
}

async fn resolve_with<P, F>(path: Option<P>, lookup: F) -> Result<Config>
where
    P: AsRef<Path>,
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.as_ref().display());
            load_config(path).await?
        }
        None => Config::default(),
    };

    config.apply_env(lookup);

    if config.uses_default_server_url() {
        tracing::info!("{} environment variable is not set, using default", SERVER_URL_ENV);
    }
    tracing::info!("Using server URL: {}", config.server_url());

    Ok(config)
}
