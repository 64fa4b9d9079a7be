//! Coupled SIR / automaton time loop.
//!
//! Per step `i`:
//!
//! ```text
//! SirIntegrator::step  →  prevalence(I)  →  CellularAutomaton::step
//!        └── append SIR state
//! if (i + 1) % sample_interval == 0:
//!        snapshot grid  →  BoxCounter::estimate  →  append (t, D)
//! ```
//!
//! The initial grid is also sampled, at `t = 0`. Everything is validated in
//! [`Simulation::new`]; a failure inside the loop aborts the run, keeps the
//! partial series (see [`Simulation::partial_result`]) and reports the step.

pub mod result;

pub use result::{GridSnapshot, RunMetadata, RunResult, RunStatus};

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::automaton::{CellState, CellularAutomaton, Grid};
use crate::config::SimulationConfig;
use crate::dimension::{BoxCounter, DimensionSample};
use crate::error::{EpiError, EpiResult, ValidationError};
use crate::prevalence::prevalence;
use crate::sir::{SirIntegrator, SirParams, SirState};

use result::RunAccumulator;

/// Lifecycle of a [`Simulation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// Validated and seeded; `run` not yet called.
    Uninitialized,
    /// Inside the time loop.
    Running,
    /// All steps finished.
    Completed,
    /// Aborted at `step`.
    Failed {
        /// Zero-based index of the failing step.
        step: usize,
    },
}

impl RunPhase {
    /// Returns true for `Completed` and `Failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed { .. })
    }
}

/// One run of the coupled model. Owns its generator and accumulator, so
/// independent simulations never interfere.
pub struct Simulation<R: Rng = StdRng> {
    config: SimulationConfig,
    run_id: Uuid,
    config_fingerprint: String,
    params: SirParams,
    integrator: SirIntegrator,
    automaton: CellularAutomaton,
    estimator: BoxCounter,
    rng: R,
    initial: Option<(SirState, Grid)>,
    phase: RunPhase,
    partial: Option<RunResult>,
}

impl Simulation<StdRng> {
    /// Validates `config` and seeds a `StdRng` from `config.random_seed`.
    ///
    /// # Errors
    ///
    /// `EpiError::Validation` or `EpiError::Estimation` if `config` is unusable.
    pub fn new(config: SimulationConfig) -> EpiResult<Self> {
        let rng = StdRng::seed_from_u64(config.random_seed);
        Self::with_rng(config, rng)
    }
}

impl<R: Rng> Simulation<R> {
    /// Validates `config` and uses `rng` for seeding and every automaton step.
    ///
    /// # Errors
    ///
    /// `EpiError::Validation` or `EpiError::Estimation` if `config` is unusable.
    pub fn with_rng(config: SimulationConfig, mut rng: R) -> EpiResult<Self> {
        config.validate_all()?;

        let state = SirState::initial(config.sir_initial_infected()?)?;
        let grid = CellularAutomaton::seed_grid(
            config.grid_size,
            config.initial_infected,
            config.placement,
            &mut rng,
        )?;

        let digest = config.fingerprint();
        let run_id = Uuid::new_v5(&Uuid::NAMESPACE_OID, &digest);

        Ok(Self {
            params: config.sir_params(),
            integrator: SirIntegrator::new(config.integration),
            automaton: CellularAutomaton::new(config.rule_config()),
            estimator: BoxCounter::new(config.pattern),
            config_fingerprint: blake3::Hash::from(digest).to_hex().to_string(),
            config,
            run_id,
            rng,
            initial: Some((state, grid)),
            phase: RunPhase::Uninitialized,
            partial: None,
        })
    }

    /// Current lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Identifier of this run.
    #[must_use]
    pub const fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// The validated configuration.
    #[must_use]
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Initial grid, before `run` is called.
    #[must_use]
    pub fn initial_grid(&self) -> Option<&Grid> {
        self.initial.as_ref().map(|(_, g)| g)
    }

    /// Series collected up to the failing step, after an aborted run.
    ///
    /// Marked [`RunStatus::Incomplete`].
    #[must_use]
    pub fn partial_result(&self) -> Option<&RunResult> {
        self.partial.as_ref()
    }

    /// Runs all `n_steps`.
    ///
    /// # Errors
    ///
    /// - `ValidationError::RunAlreadyFinished` if called twice.
    /// - `EpiError::Aborted { step, .. }` wrapping the numerical, estimation or
    ///   validation error raised at `step`.
    pub fn run(&mut self) -> EpiResult<RunResult> {
        let Some((mut state, mut grid)) = self.initial.take() else {
            return Err(ValidationError::RunAlreadyFinished.into());
        };

        let started_at = Utc::now();
        self.phase = RunPhase::Running;
        info!(
            run_id = %self.run_id,
            n_steps = self.config.n_steps,
            grid_size = self.config.grid_size,
            seed = self.config.random_seed,
            integration = ?self.config.integration,
            coupling = ?self.config.coupling,
            "starting simulation"
        );

        let mut acc = RunAccumulator::with_capacity(self.config.n_steps, self.config.sample_interval);
        acc.sir_series.push(state);
        if let Err(source) = self.sample(&mut acc, 0, 0.0, &grid) {
            return Err(self.abort(acc, 0, source, started_at));
        }

        for step in 0..self.config.n_steps {
            match self.advance(step, &state, &grid) {
                Ok((next_state, next_grid)) => {
                    state = next_state;
                    grid = next_grid;
                }
                Err(source) => return Err(self.abort(acc, step, source, started_at)),
            }
            acc.sir_series.push(state);

            let completed = step + 1;
            if completed % self.config.sample_interval == 0 {
                if let Err(source) = self.sample(&mut acc, completed, state.t, &grid) {
                    return Err(self.abort(acc, step, source, started_at));
                }
            }
        }

        self.phase = RunPhase::Completed;
        let result = acc.finish(self.run_id, RunStatus::Complete, self.metadata(started_at));
        info!(
            run_id = %self.run_id,
            peak_prevalence = result.peak_prevalence().map_or(0.0, |(_, i)| i),
            final_recovered = state.r,
            samples = result.dimensions.len(),
            fingerprint = %result.fingerprint(),
            "simulation completed"
        );
        Ok(result)
    }

    fn advance(&mut self, step: usize, state: &SirState, grid: &Grid) -> EpiResult<(SirState, Grid)> {
        let next = self.integrator.step(state, &self.params)?;
        let next = SirState {
            t: (step + 1) as f64 * self.params.dt,
            ..next
        };
        let grid = self.automaton.step(grid, prevalence(&next), &mut self.rng)?;
        Ok((next, grid))
    }

    fn sample(&self, acc: &mut RunAccumulator, step: usize, t: f64, grid: &Grid) -> EpiResult<()> {
        let dimension = self.estimator.estimate(grid)?;
        debug!(step, t, dimension, infected = grid.count(CellState::Infected), "sampled grid");
        acc.dimensions.push(DimensionSample { step, t, dimension });
        acc.snapshots.push(GridSnapshot {
            step,
            t,
            grid: grid.clone(),
        });
        Ok(())
    }

    fn abort(
        &mut self,
        acc: RunAccumulator,
        step: usize,
        source: EpiError,
        started_at: chrono::DateTime<Utc>,
    ) -> EpiError {
        error!(run_id = %self.run_id, step, error = %source, "simulation aborted");
        self.phase = RunPhase::Failed { step };
        let metadata = self.metadata(started_at);
        self.partial = Some(acc.finish(
            self.run_id,
            RunStatus::Incomplete { failed_step: step },
            metadata,
        ));
        EpiError::aborted(step, source)
    }

    fn metadata(&self, started_at: chrono::DateTime<Utc>) -> RunMetadata {
        RunMetadata {
            config: self.config.clone(),
            config_fingerprint: self.config_fingerprint.clone(),
            started_at,
            finished_at: Utc::now(),
        }
    }
}

/// Validates `config` and runs it to completion.
///
/// # Errors
///
/// See [`Simulation::new`] and [`Simulation::run`].
pub fn run(config: &SimulationConfig) -> EpiResult<RunResult> {
    Simulation::new(config.clone())?.run()
}
