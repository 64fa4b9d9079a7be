//! One-dimensional periodic grid of cell health states.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Health state of a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellState {
    /// Can be infected.
    Susceptible,
    /// Currently infected.
    Infected,
    /// Recovered; absorbing (no reinfection).
    Recovered,
}

impl CellState {
    /// Compact numeric code: 0 susceptible, 1 infected, 2 recovered.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Susceptible => 0,
            Self::Infected => 1,
            Self::Recovered => 2,
        }
    }

    /// Single-character rendering used by [`Grid`]'s `Display`.
    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Self::Susceptible => '.',
            Self::Infected => '#',
            Self::Recovered => 'o',
        }
    }
}

impl fmt::Display for CellState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Susceptible => write!(f, "susceptible"),
            Self::Infected => write!(f, "infected"),
            Self::Recovered => write!(f, "recovered"),
        }
    }
}

/// Fixed-length ring of cells, indexed `0..len` with wrap-around adjacency.
///
/// Serialized as a plain array of cell states; deserializing an empty array
/// fails the same way [`Grid::from_cells`] does.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<CellState>", into = "Vec<CellState>")]
pub struct Grid {
    cells: Vec<CellState>,
}

impl TryFrom<Vec<CellState>> for Grid {
    type Error = ValidationError;

    fn try_from(cells: Vec<CellState>) -> Result<Self, Self::Error> {
        Self::from_cells(cells)
    }
}

impl From<Grid> for Vec<CellState> {
    fn from(grid: Grid) -> Self {
        grid.cells
    }
}

impl Grid {
    /// Creates an all-susceptible grid.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::TooSmall` if `len == 0`.
    pub fn new(len: usize) -> Result<Self, ValidationError> {
        Self::from_cells(vec![CellState::Susceptible; len])
    }

    /// Wraps an explicit cell vector.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::TooSmall` if `cells` is empty.
    pub fn from_cells(cells: Vec<CellState>) -> Result<Self, ValidationError> {
        if cells.is_empty() {
            return Err(ValidationError::TooSmall {
                field: "grid_size".to_string(),
                value: 0,
                min: 1,
            });
        }
        Ok(Self { cells })
    }

    pub(crate) fn from_cells_unchecked(cells: Vec<CellState>) -> Self {
        debug_assert!(!cells.is_empty());
        Self { cells }
    }

    /// Number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Always false: grids hold at least one cell.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// State of cell `idx`, if in range.
    #[must_use]
    pub fn get(&self, idx: usize) -> Option<CellState> {
        self.cells.get(idx).copied()
    }

    /// All cells in index order.
    #[must_use]
    pub fn cells(&self) -> &[CellState] {
        &self.cells
    }

    /// Number of cells in `state`.
    #[must_use]
    pub fn count(&self, state: CellState) -> usize {
        self.cells.iter().filter(|&&c| c == state).count()
    }

    /// Number of infected cells among the `2·radius` periodic neighbours of `idx`.
    ///
    /// Assumes `2·radius + 1 <= len` so no neighbour is visited twice.
    #[must_use]
    pub fn infected_neighbors(&self, idx: usize, radius: usize) -> usize {
        let len = self.cells.len();
        (1..=radius)
            .flat_map(|d| {
                let d = d % len;
                [(idx + len - d) % len, (idx + d) % len]
            })
            .filter(|&j| self.cells[j] == CellState::Infected)
            .count()
    }

    /// Fraction of the `2·radius` neighbours of `idx` that are infected.
    #[must_use]
    pub fn neighbor_infected_fraction(&self, idx: usize, radius: usize) -> f64 {
        if radius == 0 {
            return 0.0;
        }
        self.infected_neighbors(idx, radius) as f64 / (2 * radius) as f64
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for cell in &self.cells {
            write!(f, "{}", cell.symbol())?;
        }
        Ok(())
    }
}
