//! Stats Reporter Task
//!
//! Background task that periodically logs a cache statistics snapshot.

use std::fmt;
use std::hash::Hash;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::CacheStore;

/// Spawns a background task that periodically logs cache statistics as JSON.
///
/// The task runs until aborted, sleeping for the specified interval between
/// reports. Taking a snapshot only holds the structural lock briefly, and a
/// closed store keeps reporting its final counters.
///
/// # Arguments
/// * `cache` - Store to report on
/// * `report_interval_secs` - Interval in seconds between reports
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during shutdown.
///
/// # Example
/// ```ignore
/// let cache: CacheStore<OwnerId, Vec<u8>> = CacheStore::new();
/// let reporter = spawn_stats_reporter(cache.clone(), 1);
/// // Later, during shutdown:
/// reporter.abort();
/// ```
pub fn spawn_stats_reporter<K, V>(
    cache: CacheStore<K, V>,
    report_interval_secs: u64,
) -> JoinHandle<()>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + 'static,
    V: Send + Sync + 'static,
{
    let interval = Duration::from_secs(report_interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting stats reporter with interval of {} seconds",
            report_interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            let stats = cache.stats();
            match serde_json::to_string(&stats) {
                Ok(json) => info!(hit_rate = stats.hit_rate(), "Cache stats: {}", json),
                Err(err) => warn!("Failed to serialize cache stats: {}", err),
            }

            if stats.weight > stats.capacity {
                debug!(
                    "Cache over capacity ({} > {}) with {} pinned entries",
                    stats.weight, stats.capacity, stats.pinned
                );
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::NoRelease;
    use crate::config::CacheConfig;

    #[tokio::test]
    async fn test_reporter_keeps_running() {
        let cache: CacheStore<u64, Vec<u8>> =
            CacheStore::with_config(CacheConfig::units(8)).unwrap();
        cache.put(1, vec![0; 8], 8, NoRelease).unwrap();

        let handle = spawn_stats_reporter(cache.clone(), 1);

        // Let at least one report run
        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert!(!handle.is_finished(), "Reporter should still be running");

        // Reporting never takes entries out of the store
        assert_eq!(cache.len(), 1);

        handle.abort();
    }

    #[tokio::test]
    async fn test_reporter_survives_closed_store() {
        let cache: CacheStore<u64, Vec<u8>> = CacheStore::new();
        let handle = spawn_stats_reporter(cache.clone(), 1);

        cache.close().unwrap();
        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert!(!handle.is_finished());

        handle.abort();
    }

    #[tokio::test]
    async fn test_reporter_can_be_aborted() {
        let cache: CacheStore<u64, Vec<u8>> = CacheStore::new();

        let handle = spawn_stats_reporter(cache, 1);

        // Abort immediately
        handle.abort();

        // Wait a bit and verify task is finished
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
