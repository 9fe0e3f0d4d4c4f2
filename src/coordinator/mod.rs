//! Coordinator module
//!
//! Orchestrates workers and aggregates results. A run is:
//!
//! 1. Validate the configuration (nothing is spawned on failure)
//! 2. Build the shared offset permutation once, for random workloads
//! 3. Spawn one named OS thread per worker
//! 4. Collect each worker's result over a channel; the first error ends the run
//! 5. Join every worker, shut the backend down and merge the results

pub mod starting_gun;

use crate::config::validator::validate_config;
use crate::config::Config;
use crate::distribution::OffsetPermutation;
use crate::engine::StorageBackend;
use crate::error::BenchError;
use crate::stats::aggregator::ResultAggregator;
use crate::stats::WorkerResult;
use crate::util::time::Clock;
use crate::worker::Worker;
use crate::Result;
use anyhow::Context;
use crossbeam::channel;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use tracing::{debug, info};

/// Everything a finished run produced
#[derive(Debug, Clone)]
pub struct RunReport {
    /// The validated configuration the workers ran with
    pub config: Arc<Config>,
    /// One result per worker, ordered by worker id
    pub per_worker: Vec<WorkerResult>,
    pub aggregate: WorkerResult,
}

/// Execute a complete run
///
/// # Errors
///
/// Returns the configuration error before any worker starts, or the first
/// error reported by any worker. On error no partial results are returned.
pub fn run(
    mut config: Config,
    backend: Arc<dyn StorageBackend>,
    clock: Arc<dyn Clock>,
) -> Result<RunReport> {
    validate_config(&mut config)?;
    run_validated(Arc::new(config), backend, clock)
}

/// Execute a run whose configuration already passed `validate_config`
///
/// Callers that validate up front (to show the adjusted configuration before
/// starting) use this to skip a second validation pass.
pub fn run_validated(
    config: Arc<Config>,
    backend: Arc<dyn StorageBackend>,
    clock: Arc<dyn Clock>,
) -> Result<RunReport> {
    let wl = &config.workload;

    let permutation = if wl.workload.is_random() {
        let perm = match wl.seed {
            Some(seed) => OffsetPermutation::generate_with_seed(wl.file_size, wl.block_size, seed)?,
            None => OffsetPermutation::generate(wl.file_size, wl.block_size)?,
        };
        debug!(records = perm.len(), "built offset permutation");
        Some(Arc::new(perm))
    } else {
        None
    };

    let threads = config.workers.threads;
    info!(
        threads,
        workload = %wl.workload,
        backend = backend.name(),
        "starting workers"
    );

    let (tx, rx) = channel::unbounded::<(usize, Result<WorkerResult>)>();
    let mut handles = Vec::with_capacity(threads);

    for id in 0..threads {
        let tx = tx.clone();
        let config = config.clone();
        let backend = backend.clone();
        let clock = clock.clone();
        let permutation = permutation.clone();

        let handle = thread::Builder::new()
            .name(format!("fsperf-worker-{}", id))
            .spawn(move || {
                let result = Worker::new(id, config, backend, clock, permutation)
                    .and_then(|worker| worker.run());
                // The receiver is gone only if the driver already failed
                let _ = tx.send((id, result));
            })
            .with_context(|| format!("Failed to spawn worker thread {}", id))?;
        handles.push(handle);
    }
    drop(tx);

    let mut aggregator = ResultAggregator::new();
    for _ in 0..threads {
        match rx.recv() {
            Ok((_, Ok(result))) => {
                debug!(
                    worker_id = ?result.worker_id,
                    files_done = result.files_done(),
                    "worker reported"
                );
                aggregator.add_worker(result);
            }
            Ok((id, Err(e))) => return Err(e.context(format!("worker {} failed", id))),
            Err(_) => anyhow::bail!("Worker thread panicked before reporting a result"),
        }
    }

    for handle in handles {
        handle
            .join()
            .map_err(|_| anyhow::anyhow!("Worker thread panicked"))?;
    }

    backend
        .shutdown()
        .map_err(|e| BenchError::storage("shutdown", Path::new(backend.name()), e))?;

    let aggregate = aggregator.aggregate();
    info!(
        files_done = aggregate.files_done(),
        io_count = aggregate.io_count,
        "all workers finished"
    );

    Ok(RunReport {
        config,
        per_worker: aggregator.per_worker(),
        aggregate,
    })
}
