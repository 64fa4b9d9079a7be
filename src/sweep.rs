//! Monte Carlo sweeps over random seeds.
//!
//! One configuration is run once per seed on a small bounded thread pool.
//! Every run builds its own [`Simulation`] (own generator, own accumulator),
//! so workers share nothing mutable; results are reassembled in seed order.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::{debug, info};

use crate::automaton::CellState;
use crate::config::SimulationConfig;
use crate::error::{EpiError, EpiResult};
use crate::simulation::{RunResult, Simulation};

/// Worker pool sizing.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Number of worker threads.
    pub workers: usize,
    /// Maximum queued jobs.
    pub queue_capacity: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            workers: thread::available_parallelism().map_or(2, usize::from),
            queue_capacity: 64,
        }
    }
}

/// Executes one configuration on a worker thread.
type Runner = fn(SimulationConfig) -> EpiResult<RunResult>;

fn run_one(config: SimulationConfig) -> EpiResult<RunResult> {
    Simulation::new(config).and_then(|mut sim| sim.run())
}

struct Job {
    index: usize,
    config: SimulationConfig,
    reply: Sender<(usize, EpiResult<RunResult>)>,
}

struct WorkerPool {
    tx: Sender<Job>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    fn start(workers: usize, queue_capacity: usize, runner: Runner) -> EpiResult<Self> {
        let workers = workers.max(1);
        let (tx, rx) = bounded::<Job>(queue_capacity.max(1));

        let mut handles = Vec::with_capacity(workers);
        for idx in 0..workers {
            let rx: Receiver<Job> = rx.clone();
            let handle = thread::Builder::new()
                .name(format!("episim-sweep-{idx}"))
                .spawn(move || {
                    while let Ok(Job { index, config, reply }) = rx.recv() {
                        let _ = reply.send((index, runner(config)));
                    }
                })
                .map_err(|e| EpiError::internal(format!("failed to spawn sweep worker: {e}")))?;
            handles.push(handle);
        }

        Ok(Self { tx, workers: handles })
    }

    /// Closes the queue. Workers drain what is queued, then exit; if they have
    /// all died, queued jobs (and their reply senders) are dropped.
    fn close(self) -> Vec<JoinHandle<()>> {
        drop(self.tx);
        self.workers
    }
}

/// Runs every config on the pool; slot `k` holds the result of `configs[k]`,
/// or `None` if no worker replied for it.
fn dispatch(
    pool: &SweepConfig,
    configs: Vec<SimulationConfig>,
    runner: Runner,
) -> EpiResult<Vec<Option<EpiResult<RunResult>>>> {
    let total = configs.len();
    let workers = WorkerPool::start(pool.workers, pool.queue_capacity, runner)?;
    let (reply_tx, reply_rx) = bounded(total.max(1));

    for (index, config) in configs.into_iter().enumerate() {
        let job = Job {
            index,
            config,
            reply: reply_tx.clone(),
        };
        if workers.tx.send(job).is_err() {
            break;
        }
    }
    drop(reply_tx);
    let handles = workers.close();

    let mut slots: Vec<Option<EpiResult<RunResult>>> = (0..total).map(|_| None).collect();
    // Ends once every reply sender is gone: all jobs answered or dropped.
    for (index, result) in reply_rx.iter() {
        debug!(index, ok = result.is_ok(), "sweep run finished");
        slots[index] = Some(result);
    }
    for handle in handles {
        let _ = handle.join();
    }
    Ok(slots)
}

/// Aggregate over all seeds of a sweep.
#[derive(Debug, Clone)]
pub struct SweepReport {
    /// One result per seed, in the order the seeds were given.
    pub runs: Vec<RunResult>,
    /// Mean number of recovered cells in the final snapshot.
    pub mean_final_recovered_cells: f64,
    /// Mean dimension at each sampling instant, as `(t, mean D)`.
    pub mean_dimension_series: Vec<(f64, f64)>,
}

impl SweepReport {
    fn from_runs(runs: Vec<RunResult>) -> Self {
        let n = runs.len().max(1) as f64;
        let mean_final_recovered_cells = runs
            .iter()
            .filter_map(RunResult::final_grid)
            .map(|g| g.count(CellState::Recovered) as f64)
            .sum::<f64>()
            / n;

        // All runs share the configuration, hence the sampling instants.
        let samples = runs.first().map_or(0, |r| r.dimensions.len());
        let mean_dimension_series = (0..samples)
            .map(|k| {
                let t = runs[0].dimensions[k].t;
                let sum: f64 = runs.iter().map(|r| r.dimensions[k].dimension).sum();
                (t, sum / n)
            })
            .collect();

        Self {
            runs,
            mean_final_recovered_cells,
            mean_dimension_series,
        }
    }
}

/// Runs one configuration across many seeds.
pub struct SeedSweep {
    base: SimulationConfig,
    seeds: Vec<u64>,
    pool: SweepConfig,
}

impl SeedSweep {
    /// Creates a sweep of `base` over `seeds`.
    #[must_use]
    pub fn new(base: SimulationConfig, seeds: Vec<u64>, pool: SweepConfig) -> Self {
        Self { base, seeds, pool }
    }

    /// Seeds `first, first + 1, …` (`count` of them).
    #[must_use]
    pub fn consecutive(base: SimulationConfig, first: u64, count: usize, pool: SweepConfig) -> Self {
        let seeds = (0..count as u64).map(|k| first.wrapping_add(k)).collect();
        Self::new(base, seeds, pool)
    }

    /// Runs every seed and aggregates.
    ///
    /// # Errors
    ///
    /// The base configuration is validated up front; otherwise the error of
    /// the first seed (in seed order) whose run failed.
    pub fn run(self) -> EpiResult<SweepReport> {
        self.base.validate_all()?;
        if self.seeds.is_empty() {
            return Ok(SweepReport::from_runs(Vec::new()));
        }
        info!(seeds = self.seeds.len(), workers = self.pool.workers, "starting seed sweep");

        let configs = self
            .seeds
            .iter()
            .map(|&seed| SimulationConfig {
                random_seed: seed,
                ..self.base.clone()
            })
            .collect();
        let slots = dispatch(&self.pool, configs, run_one)?;

        let mut runs = Vec::with_capacity(slots.len());
        for (index, slot) in slots.into_iter().enumerate() {
            match slot {
                Some(Ok(run)) => runs.push(run),
                Some(Err(e)) => return Err(e),
                None => {
                    return Err(EpiError::internal(format!(
                        "sweep worker dropped seed {}",
                        self.seeds[index]
                    )))
                }
            }
        }

        let report = SweepReport::from_runs(runs);
        info!(
            runs = report.runs.len(),
            mean_final_recovered_cells = report.mean_final_recovered_cells,
            "seed sweep completed"
        );
        Ok(report)
    }
}
