//! Soak Run
//!
//! Concurrent producer/consumer workload against a single store, finished by
//! an audit that every cached payload was cleaned up exactly once.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info};

use crate::cache::CacheStore;
use crate::config::SoakConfig;
use crate::owner::OwnerId;
use crate::tasks::spawn_stats_reporter;

type FrameStore = CacheStore<OwnerId, Vec<u8>>;

// == Soak Report ==
/// Outcome of a soak run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SoakReport {
    /// Operations issued by all workers
    pub operations: u64,
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that had to recompute the payload
    pub misses: u64,
    /// Payloads written, including recomputations after misses
    pub puts: u64,
    /// Explicit invalidations
    pub purges: u64,
    /// Entries the store created
    pub created: u64,
    /// Cleanup actions observed
    pub destroyed: u64,
    pub evictions: u64,
    pub deferred: u64,
    pub elapsed_ms: u64,
}

impl SoakReport {
    fn absorb(&mut self, tally: WorkerTally) {
        self.operations += tally.operations;
        self.hits += tally.hits;
        self.misses += tally.misses;
        self.puts += tally.puts;
        self.purges += tally.purges;
    }
}

#[derive(Debug, Default)]
struct WorkerTally {
    operations: u64,
    hits: u64,
    misses: u64,
    puts: u64,
    purges: u64,
}

/// Runs the soak workload described by `config`.
///
/// Workers run on blocking threads until the configured duration elapses or
/// `stop` is raised. Afterwards the store is closed and the run fails if any
/// payload was read back corrupted or was not cleaned up exactly once.
pub async fn run_soak(config: &SoakConfig, stop: Arc<AtomicBool>) -> anyhow::Result<SoakReport> {
    let store: FrameStore =
        CacheStore::with_config(config.cache).context("invalid soak cache configuration")?;
    let owners: Arc<[OwnerId]> = (0..config.owners).map(|_| OwnerId::next()).collect();
    let destroyed = Arc::new(AtomicU64::new(0));
    let started = Instant::now();
    let deadline = started + Duration::from_secs(config.duration_secs);

    info!(
        "Soak run starting: {} workers over {} owners for {}s",
        config.workers, config.owners, config.duration_secs
    );
    let reporter = spawn_stats_reporter(store.clone(), config.report_interval_secs);

    let mut workers = Vec::with_capacity(config.workers);
    for index in 0..config.workers {
        let store = store.clone();
        let owners = Arc::clone(&owners);
        let destroyed = Arc::clone(&destroyed);
        let stop = Arc::clone(&stop);
        let payload_bytes = config.payload_bytes;

        workers.push(tokio::task::spawn_blocking(move || {
            let mut worker = Worker {
                store: &store,
                owners: &owners,
                destroyed: &destroyed,
                payload_bytes,
                rng: SmallRng::seed_from_u64(index as u64),
                tally: WorkerTally::default(),
            };
            worker.run(&stop, deadline)?;
            Ok::<_, anyhow::Error>(worker.tally)
        }));
    }

    let mut report = SoakReport::default();
    for handle in workers {
        let tally = handle.await.context("soak worker panicked")??;
        report.absorb(tally);
    }
    reporter.abort();

    store.close().context("failed to close soak store")?;
    let stats = store.stats();
    report.created = stats.insertions;
    report.destroyed = destroyed.load(Ordering::SeqCst);
    report.evictions = stats.evictions;
    report.deferred = stats.deferred;
    report.elapsed_ms = started.elapsed().as_millis() as u64;

    if stats.retired_pinned != 0 {
        bail!(
            "{} entries still pinned after every worker finished",
            stats.retired_pinned
        );
    }
    if report.created != report.destroyed {
        bail!(
            "{} payloads cached but {} cleaned up",
            report.created,
            report.destroyed
        );
    }
    Ok(report)
}

// == Worker ==
struct Worker<'a> {
    store: &'a FrameStore,
    owners: &'a [OwnerId],
    destroyed: &'a Arc<AtomicU64>,
    payload_bytes: usize,
    rng: SmallRng,
    tally: WorkerTally,
}

impl Worker<'_> {
    fn run(&mut self, stop: &AtomicBool, deadline: Instant) -> anyhow::Result<()> {
        while !stop.load(Ordering::Relaxed) && Instant::now() < deadline {
            let owner = self.owners[self.rng.gen_range(0..self.owners.len())];
            match self.rng.gen_range(0..10) {
                0..=5 => self.consume(owner)?,
                6..=8 => self.produce(owner)?,
                _ => {
                    self.store.purge(&owner)?;
                    self.tally.purges += 1;
                }
            }
            self.tally.operations += 1;
        }
        debug!("Soak worker finished: {:?}", self.tally);
        Ok(())
    }

    /// Reads the cached frame of `owner`, recomputing it on a miss.
    fn consume(&mut self, owner: OwnerId) -> anyhow::Result<()> {
        let Some(item) = self.store.get(&owner)? else {
            self.tally.misses += 1;
            return self.produce(owner);
        };
        self.tally.hits += 1;

        let (payload, size) = item.data();
        let Some(&fill) = payload.first() else {
            if size != 0 {
                bail!("{} holds an empty payload of declared size {}", owner, size);
            }
            return Ok(());
        };
        if payload.len() as u64 != size || payload.iter().any(|&b| b != fill) {
            bail!("{} holds a corrupted payload", owner);
        }
        item.close();
        Ok(())
    }

    fn produce(&mut self, owner: OwnerId) -> anyhow::Result<()> {
        let payload = vec![self.rng.gen::<u8>(); self.payload_bytes];
        let size = payload.len() as u64;
        let destroyed = Arc::clone(self.destroyed);
        self.store.put(owner, payload, size, move |_: &Vec<u8>| {
            destroyed.fetch_add(1, Ordering::SeqCst);
        })?;
        self.tally.puts += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;

    fn short_config(cache: CacheConfig) -> SoakConfig {
        SoakConfig {
            cache,
            workers: 4,
            owners: 16,
            duration_secs: 1,
            report_interval_secs: 1,
            payload_bytes: 64,
        }
    }

    #[tokio::test]
    async fn test_soak_run_cleans_up_every_payload() {
        let config = short_config(CacheConfig::units(4));
        let report = run_soak(&config, Arc::new(AtomicBool::new(false)))
            .await
            .unwrap();

        assert!(report.operations > 0);
        // Every miss is followed by a recomputing put
        assert_eq!(report.hits + report.puts + report.purges, report.operations);
        assert_eq!(report.created, report.puts);
        assert_eq!(report.created, report.destroyed);
        assert!(report.evictions > 0, "16 owners over 4 slots must evict");
    }

    #[tokio::test]
    async fn test_soak_run_byte_weighed() {
        let config = short_config(CacheConfig::bytes(64 * 3));
        let report = run_soak(&config, Arc::new(AtomicBool::new(false)))
            .await
            .unwrap();

        assert_eq!(report.created, report.destroyed);
    }

    #[tokio::test]
    async fn test_soak_run_stops_early() {
        let mut config = short_config(CacheConfig::units(4));
        config.duration_secs = 60;

        let stop = Arc::new(AtomicBool::new(true));
        let started = Instant::now();
        let report = run_soak(&config, stop).await.unwrap();

        assert_eq!(report.operations, 0);
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_soak_run_rejects_oversized_unit_capacity() {
        let config = short_config(CacheConfig::units(1000));
        let result = run_soak(&config, Arc::new(AtomicBool::new(false))).await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("invalid soak cache configuration"));
    }
}
