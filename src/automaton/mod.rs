//! One-dimensional epidemic cellular automaton.
//!
//! Each step every cell is updated from the *previous* grid only:
//!
//! ```text
//! Susceptible → Infected   with p_infect(local infected neighbours, prevalence)
//! Infected    → Recovered  with p_recover
//! Recovered   → Recovered  (no reinfection in this model)
//! ```
//!
//! Randomness is drawn from the caller's generator, one uniform draw per
//! susceptible or infected cell in index order, so a seeded generator gives a
//! reproducible trajectory.

pub mod grid;
pub mod rules;

pub use grid::{CellState, Grid};
pub use rules::{CouplingMode, RuleConfig};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// How many cells start infected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InitialInfected {
    /// Exact number of cells.
    Count(usize),
    /// Fraction of the grid in [0, 1], rounded to the nearest cell count.
    Fraction(f64),
}

impl Default for InitialInfected {
    fn default() -> Self {
        Self::Count(1)
    }
}

impl InitialInfected {
    /// Resolves to an exact cell count for a grid of `grid_size` cells.
    ///
    /// # Errors
    ///
    /// - `ValidationError::OutOfRange` if a fraction is outside [0, 1].
    /// - `ValidationError::InitialInfectedExceedsGrid` if a count exceeds `grid_size`.
    pub fn resolve(self, grid_size: usize) -> Result<usize, ValidationError> {
        match self {
            Self::Count(count) => {
                if count > grid_size {
                    return Err(ValidationError::InitialInfectedExceedsGrid { count, grid_size });
                }
                Ok(count)
            }
            Self::Fraction(f) => {
                rules::unit_interval("initial_infected", f)?;
                let count = (f * grid_size as f64).round() as usize;
                Ok(count.min(grid_size))
            }
        }
    }

    /// Infected proportion this setting implies for a grid of `grid_size` cells.
    #[must_use]
    pub fn proportion(self, grid_size: usize) -> f64 {
        match self {
            Self::Count(count) => count as f64 / grid_size as f64,
            Self::Fraction(f) => f,
        }
    }
}

/// Where the initially infected cells go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// Distinct positions drawn uniformly at random.
    #[default]
    Random,
    /// A contiguous block centred on `len / 2`.
    Centered,
}

/// Applies the local rule to a [`Grid`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CellularAutomaton {
    rules: RuleConfig,
}

impl CellularAutomaton {
    /// Creates an automaton with the given rule. Call [`RuleConfig::validate`] first.
    #[must_use]
    pub const fn new(rules: RuleConfig) -> Self {
        Self { rules }
    }

    /// The rule in use.
    #[must_use]
    pub const fn rules(&self) -> &RuleConfig {
        &self.rules
    }

    /// Builds the initial grid: `initial` cells infected, the rest susceptible.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` if `len == 0` or `initial` does not fit.
    pub fn seed_grid(
        len: usize,
        initial: InitialInfected,
        placement: Placement,
        rng: &mut impl Rng,
    ) -> Result<Grid, ValidationError> {
        let mut cells = Grid::new(len)?.cells().to_vec();
        let count = initial.resolve(len)?;
        match placement {
            Placement::Random => {
                for idx in rand::seq::index::sample(rng, len, count) {
                    cells[idx] = CellState::Infected;
                }
            }
            Placement::Centered => {
                let start = (len / 2).saturating_sub(count / 2);
                for offset in 0..count {
                    cells[(start + offset) % len] = CellState::Infected;
                }
            }
        }
        Ok(Grid::from_cells_unchecked(cells))
    }

    /// Computes the next grid from `grid` under global `prevalence`.
    ///
    /// `grid` is never written; the result is a fresh grid, so snapshots
    /// handed out earlier stay valid.
    ///
    /// # Errors
    ///
    /// - `ValidationError::OutOfRange` if `prevalence` is not in [0, 1].
    /// - Any [`RuleConfig::validate`] failure against `grid`'s length, e.g.
    ///   `p_recover` outside [0, 1] or a neighbourhood that does not fit.
    pub fn step(
        &self,
        grid: &Grid,
        prevalence: f64,
        rng: &mut impl Rng,
    ) -> Result<Grid, ValidationError> {
        rules::unit_interval("prevalence", prevalence)?;
        self.rules.validate(grid.len())?;
        let radius = self.rules.neighborhood_radius;

        let next = grid
            .cells()
            .iter()
            .enumerate()
            .map(|(idx, &cell)| match cell {
                CellState::Susceptible => {
                    let p = self
                        .rules
                        .infection_probability(grid.infected_neighbors(idx, radius), prevalence);
                    if rng.gen::<f64>() < p {
                        CellState::Infected
                    } else {
                        CellState::Susceptible
                    }
                }
                CellState::Infected => {
                    if rng.gen::<f64>() < self.rules.p_recover {
                        CellState::Recovered
                    } else {
                        CellState::Infected
                    }
                }
                CellState::Recovered => CellState::Recovered,
            })
            .collect();

        Ok(Grid::from_cells_unchecked(next))
    }
}
