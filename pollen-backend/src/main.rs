use pollen_backend::config;
use pollen_backend::model::pollen::{PollenClient, PollenUpdater};

use anyhow::{Context, Result};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());

    // Load configuration
    let config = config::read_config(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;

    // Initialize logging
    let _logging_guard = pollen_backend::logging::init_logging(
        &config.log_dir,
        "pollen-backend",
        &config.log_level,
    )?;

    tracing::info!("Pollen backend starting...");
    tracing::info!(
        "Tracking regions {:?} and pollen types {:?} from {}",
        config.regions,
        config.pollen_types,
        config.feed_url
    );

    let client = Arc::new(PollenClient::from_config(config).context("Failed to create pollen client")?);

    let updater = PollenUpdater::new(client.clone(), config.update_interval_minutes);
    let handle = updater.start();

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    tracing::info!("Shutting down pollen backend");
    handle.abort();

    let status = client.status().await;
    tracing::info!(
        "Last successful update: {}",
        status
            .last_success
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never".to_string())
    );

    Ok(())
}
