//! Render offload onto worker threads
//!
//! Workers only see a byte copy taken with `MemoryModel::read` and write a
//! private raster, so the device is never touched off the caller's thread.
//! Results come back over a channel and are applied by the owner of the
//! [`TileCache`] in [`RenderScheduler::drain`], [`RenderScheduler::wait_one`]
//! or [`RenderScheduler::wait`], which keeps cache access on one thread.
//!
//! There is no cancellation. A job whose sector was modified while it ran
//! still finishes; its result is dropped when the captured revision no
//! longer matches the [`RevisionTable`].

use std::collections::HashSet;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use super::{
    render_tile, render_tile_bits, BitMatrix, DetailStyle, Orientation, Raster, RenderConfig,
    TileCache, TileKey,
};
use crate::cache::RevisionTable;
use crate::error::Result;

/// One render request
#[derive(Debug, Clone)]
pub struct RenderJob {
    /// Key the result is cached under; its revision is the one captured
    /// when `bytes` were read
    pub key: TileKey,
    /// Copy of the sector
    pub bytes: Vec<u8>,
    /// Already unpacked bits of `bytes`, in the key's bit order
    pub bits: Option<Arc<BitMatrix>>,
    /// Axis convention
    pub orientation: Orientation,
    /// Detailed-tier settings
    pub style: DetailStyle,
    /// Render constants
    pub config: Arc<RenderConfig>,
}

struct RenderOutcome {
    key: TileKey,
    result: Result<Raster>,
}

/// What a drain applied
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainStats {
    /// Results stored in the cache
    pub applied: usize,
    /// Results dropped because their sector changed meanwhile
    pub stale: usize,
    /// Jobs whose render returned an error
    pub failed: usize,
}

impl DrainStats {
    fn add(&mut self, other: DrainStats) {
        self.applied += other.applied;
        self.stale += other.stale;
        self.failed += other.failed;
    }
}

/// Fixed pool of render threads
pub struct RenderScheduler {
    jobs: Option<Sender<RenderJob>>,
    results: Receiver<RenderOutcome>,
    workers: Vec<JoinHandle<()>>,
    in_flight: HashSet<TileKey>,
    stale_total: usize,
}

impl RenderScheduler {
    /// Spawn `workers` threads (at least one)
    pub fn new(workers: usize) -> Self {
        let (job_tx, job_rx) = mpsc::channel::<RenderJob>();
        let (result_tx, result_rx) = mpsc::channel();
        let job_rx = Arc::new(Mutex::new(job_rx));

        let workers = (0..workers.max(1))
            .map(|id| {
                let job_rx = Arc::clone(&job_rx);
                let result_tx = result_tx.clone();
                thread::spawn(move || worker_loop(id, job_rx, result_tx))
            })
            .collect();

        Self {
            jobs: Some(job_tx),
            results: result_rx,
            workers,
            in_flight: HashSet::new(),
            stale_total: 0,
        }
    }

    /// Number of worker threads
    pub fn workers(&self) -> usize {
        self.workers.len()
    }

    /// Queue a job
    ///
    /// Returns `false` without queueing if a job with the same key is
    /// still in flight, or if the workers are gone.
    pub fn submit(&mut self, job: RenderJob) -> bool {
        if self.in_flight.contains(&job.key) {
            log::trace!("render of sector {} already in flight", job.key.sector);
            return false;
        }
        let key = job.key;
        let Some(jobs) = self.jobs.as_ref() else {
            return false;
        };
        if jobs.send(job).is_err() {
            return false;
        }
        self.in_flight.insert(key);
        true
    }

    /// Whether a job for `key` is queued or running
    pub fn is_in_flight(&self, key: &TileKey) -> bool {
        self.in_flight.contains(key)
    }

    /// Number of jobs queued or running
    pub fn pending(&self) -> usize {
        self.in_flight.len()
    }

    /// Stale results dropped over the scheduler's lifetime
    pub fn stale_total(&self) -> usize {
        self.stale_total
    }

    /// Apply every result that is ready, without blocking
    pub fn drain(&mut self, cache: &mut TileCache, revisions: &RevisionTable) -> DrainStats {
        let mut stats = DrainStats::default();
        while let Ok(outcome) = self.results.try_recv() {
            stats.add(self.apply(outcome, cache, revisions));
        }
        stats
    }

    /// Block until one result arrives and apply it
    ///
    /// Returns `None` when nothing is in flight, or when the workers have
    /// exited; pending jobs are forgotten in the latter case.
    pub fn wait_one(
        &mut self,
        cache: &mut TileCache,
        revisions: &RevisionTable,
    ) -> Option<DrainStats> {
        if self.in_flight.is_empty() {
            return None;
        }
        match self.results.recv() {
            Ok(outcome) => Some(self.apply(outcome, cache, revisions)),
            Err(_) => {
                log::warn!("render workers exited with {} job(s) pending", self.in_flight.len());
                self.in_flight.clear();
                None
            }
        }
    }

    /// Block until every submitted job has been applied
    pub fn wait(&mut self, cache: &mut TileCache, revisions: &RevisionTable) -> DrainStats {
        let mut stats = DrainStats::default();
        while let Some(one) = self.wait_one(cache, revisions) {
            stats.add(one);
        }
        stats
    }

    fn apply(
        &mut self,
        outcome: RenderOutcome,
        cache: &mut TileCache,
        revisions: &RevisionTable,
    ) -> DrainStats {
        let RenderOutcome { key, result } = outcome;
        self.in_flight.remove(&key);
        let mut stats = DrainStats::default();
        match result {
            Ok(raster) => {
                let current = revisions.revision(key.sector).ok();
                if current == Some(key.revision) {
                    cache.put(key, Arc::new(raster));
                    stats.applied += 1;
                } else {
                    log::debug!(
                        "dropping stale render of sector {} (revision {} vs {:?})",
                        key.sector,
                        key.revision,
                        current
                    );
                    self.stale_total += 1;
                    stats.stale += 1;
                }
            }
            Err(e) => {
                log::warn!("render of sector {} failed: {}", key.sector, e);
                stats.failed += 1;
            }
        }
        stats
    }
}

impl Drop for RenderScheduler {
    fn drop(&mut self) {
        // Closing the job channel ends every worker loop
        self.jobs.take();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop(id: usize, jobs: Arc<Mutex<Receiver<RenderJob>>>, results: Sender<RenderOutcome>) {
    loop {
        let job = match jobs.lock() {
            Ok(rx) => rx.recv(),
            Err(_) => break,
        };
        let Ok(job) = job else { break };
        log::trace!("worker {}: rendering sector {}", id, job.key.sector);
        let result = match &job.bits {
            Some(bits) => render_tile_bits(
                &job.bytes,
                bits,
                job.key.detail,
                job.orientation,
                &job.style,
                &job.config,
            ),
            None => render_tile(
                &job.bytes,
                job.key.bit_order,
                job.key.detail,
                job.orientation,
                &job.style,
                &job.config,
            ),
        };
        if results
            .send(RenderOutcome {
                key: job.key,
                result,
            })
            .is_err()
        {
            break;
        }
    }
}
