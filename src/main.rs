//! Frame Cache soak harness
//!
//! Runs concurrent producers and consumers against one cache store and fails
//! if any payload is corrupted or not cleaned up exactly once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use frame_cache::{run_soak, SoakConfig};

/// Main entry point for the soak harness.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Install the Ctrl+C / SIGTERM handler that ends the run early
/// 4. Run the soak workload and audit the store
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "frame_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting frame cache soak harness");

    let config = SoakConfig::from_env();
    info!(
        "Configuration loaded: capacity={} {}, workers={}, owners={}, duration={}s, payload={}B",
        config.cache.capacity,
        config.cache.weighing,
        config.workers,
        config.owners,
        config.duration_secs,
        config.payload_bytes
    );

    let stop = Arc::new(AtomicBool::new(false));
    let signal_handle = tokio::spawn(shutdown_signal(Arc::clone(&stop)));

    let result = run_soak(&config, stop).await;
    signal_handle.abort();

    let report = result?;
    info!("Soak run complete: {}", serde_json::to_string(&report)?);
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM) and asks workers to stop.
async fn shutdown_signal(stop: Arc<AtomicBool>) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, stopping workers...");
        }
        _ = terminate => {
            info!("Received SIGTERM, stopping workers...");
        }
    }

    stop.store(true, Ordering::Relaxed);
}
