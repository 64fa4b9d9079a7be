//! # episim - coupled SIR / cellular automaton outbreak simulator
//!
//! A well-mixed SIR compartment model drives the infection pressure on a
//! one-dimensional periodic cellular automaton. At regular intervals the
//! infected pattern on the lattice is measured with a box-counting
//! similarity dimension, producing three aligned series: the SIR
//! trajectory, grid snapshots, and `(t, D)` samples.
//!
//! ## Core Concepts
//!
//! - **SirIntegrator**: advances `(S, I, R)` by one `dt` (Euler or RK4)
//! - **prevalence**: the scalar coupling `I` handed to the lattice
//! - **CellularAutomaton**: stochastic synchronous update of a [`Grid`]
//! - **BoxCounter**: similarity dimension of the infected pattern
//! - **Simulation**: the time loop gluing them together
//!
//! ## Usage
//!
//! ```rust,ignore
//! use episim::{Simulation, SimulationConfig};
//!
//! let config = SimulationConfig {
//!     beta: 0.3,
//!     gamma: 0.1,
//!     grid_size: 256,
//!     ..SimulationConfig::default()
//! };
//! let result = Simulation::new(config)?.run()?;
//! println!("peak I = {:?}", result.peak_prevalence());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]

// Model components
pub mod automaton;
pub mod dimension;
pub mod prevalence;
pub mod sir;

// Orchestration
pub mod config;
pub mod error;
pub mod export;
pub mod simulation;
pub mod sweep;

// Re-export primary types at crate root for convenience
pub use automaton::{
    CellState, CellularAutomaton, CouplingMode, Grid, InitialInfected, Placement, RuleConfig,
};
pub use config::SimulationConfig;
pub use dimension::{BoxCounter, DimensionSample, PatternTarget};
pub use error::{EpiError, EpiResult, EstimationError, NumericalError, ValidationError};
pub use prevalence::prevalence;
pub use sir::{IntegrationMethod, SirIntegrator, SirParams, SirState};
pub use simulation::{
    run, GridSnapshot, RunMetadata, RunPhase, RunResult, RunStatus, Simulation,
};
pub use sweep::{SeedSweep, SweepConfig, SweepReport};
