use std::ops::Range;

use thiserror::Error;

use crate::boid::Boid;

use super::rules::{update_batch, Tick};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("worker pool needs at least one worker")]
    NoWorkers,
    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// Split `0..len` into `workers` contiguous ranges.
///
/// Every range holds `len / workers` indices except the last, which also takes
/// the remainder. Ranges may be empty when `len < workers`.
pub fn partition(len: usize, workers: usize) -> Vec<Range<usize>> {
    let workers = workers.max(1);
    let batch = len / workers;
    (0..workers)
        .map(|i| {
            let start = i * batch;
            let end = if i == workers - 1 { len } else { start + batch };
            start..end
        })
        .collect()
}

/// Fixed worker pool that updates the flock in disjoint contiguous batches.
///
/// Each worker owns its batch exclusively and reads the rest of the flock from
/// a snapshot taken at the start of the tick. `run` returns only after every
/// batch is written.
pub struct Dispatcher {
    pool: rayon::ThreadPool,
    workers: usize,
    /// Pre-tick copy of the flock, reused across ticks.
    snapshot: Vec<Boid>,
}

impl Dispatcher {
    pub fn new(workers: usize) -> Result<Self, DispatchError> {
        if workers == 0 {
            return Err(DispatchError::NoWorkers);
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("boid-worker-{i}"))
            .build()?;
        Ok(Self {
            pool,
            workers,
            snapshot: Vec::new(),
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn run(&mut self, boids: &mut [Boid], tick: Tick<'_>) {
        self.snapshot.clear();
        self.snapshot.extend_from_slice(boids);

        let snapshot = &self.snapshot;
        let ranges = partition(boids.len(), self.workers);
        let mut rest = boids;

        // scope() joins every spawned batch before returning.
        self.pool.scope(|s| {
            for range in ranges {
                let (batch, remaining) = std::mem::take(&mut rest).split_at_mut(range.len());
                rest = remaining;
                if batch.is_empty() {
                    continue;
                }
                let lead = &snapshot[..range.start];
                let tail = &snapshot[range.end..];
                s.spawn(move |_| update_batch(lead, batch, tail, tick));
            }
        });
    }
}
