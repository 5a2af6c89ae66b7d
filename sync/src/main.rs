//! Scorecard sync daemon.
//!
//! Keeps the on-device offline queue flowing: it watches connectivity to the
//! rounds API and drains queued score submissions whenever the device comes
//! back online.

use std::sync::Arc;

use scorecard_sync::{
    HttpConnectivity, HttpScoresClient, NetworkMonitor, OfflineQueue, QueueDrainer, SqliteKvStore,
    SyncConfig,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scorecard_sync=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = SyncConfig::from_env()?;

    tracing::info!(api_url = %config.api_url, "Starting scorecard sync");

    let store = Arc::new(SqliteKvStore::connect(&config.database_url).await?);
    let queue = Arc::new(OfflineQueue::new(store).with_max_retries(config.max_retries));
    let remote = Arc::new(HttpScoresClient::from_config(&config)?);

    match queue.len().await {
        Ok(pending) => tracing::info!(pending, "offline queue loaded"),
        Err(e) => tracing::warn!(error = %e, "offline queue unreadable"),
    }

    let monitor = NetworkMonitor::new_shared();
    let drainer = QueueDrainer::spawn(&monitor, queue, remote);
    monitor.start(Arc::new(HttpConnectivity::from_config(&config)?));

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");

    monitor.stop();
    drainer.shutdown().await;

    Ok(())
}
