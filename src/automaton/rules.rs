//! Local transition rule parameters.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// How local and global infection pressure combine into `p_infect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CouplingMode {
    /// `clamp(f_local·k_local + prevalence·k_global, 0, 1)`, where `f_local`
    /// is the infected fraction of the neighbourhood.
    #[default]
    Additive,
    /// `clamp(k_local · n_infected · prevalence, 0, 1)`, where `n_infected` is
    /// the count of infected neighbours. A cell with no infected neighbour
    /// cannot be infected; `k_global` is ignored.
    Multiplicative,
}

/// Parameters of the per-cell update rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Neighbours on each side considered by the local rule.
    pub neighborhood_radius: usize,
    /// Weight of the local infected fraction.
    pub k_local: f64,
    /// Weight of the global prevalence.
    pub k_global: f64,
    /// Per-step probability that an infected cell recovers.
    pub p_recover: f64,
    /// Functional form combining the two pressures.
    pub coupling: CouplingMode,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            neighborhood_radius: 1,
            k_local: 0.8,
            k_global: 1.0,
            p_recover: 0.1,
            coupling: CouplingMode::Additive,
        }
    }
}

impl RuleConfig {
    /// Validates the rule against a grid of `grid_len` cells.
    ///
    /// # Errors
    ///
    /// Returns the first `ValidationError` found.
    pub fn validate(&self, grid_len: usize) -> Result<(), ValidationError> {
        if self.neighborhood_radius < 1 {
            return Err(ValidationError::TooSmall {
                field: "neighborhood_radius".to_string(),
                value: self.neighborhood_radius,
                min: 1,
            });
        }
        // 2r + 1 <= len, written so a huge radius cannot overflow.
        if self.neighborhood_radius > grid_len.saturating_sub(1) / 2 {
            return Err(ValidationError::RadiusTooLarge {
                radius: self.neighborhood_radius,
                grid_size: grid_len,
            });
        }
        non_negative("k_local", self.k_local)?;
        non_negative("k_global", self.k_global)?;
        unit_interval("p_recover", self.p_recover)?;
        Ok(())
    }

    /// Infection probability for a susceptible cell with `infected_neighbors`
    /// infected cells among its `2·radius` neighbours.
    #[must_use]
    pub fn infection_probability(&self, infected_neighbors: usize, prevalence: f64) -> f64 {
        let p = match self.coupling {
            CouplingMode::Additive => {
                let local = infected_neighbors as f64 / (2 * self.neighborhood_radius) as f64;
                local * self.k_local + prevalence * self.k_global
            }
            CouplingMode::Multiplicative => {
                self.k_local * infected_neighbors as f64 * prevalence
            }
        };
        p.clamp(0.0, 1.0)
    }
}

pub(crate) fn non_negative(field: &str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ValidationError::Negative {
            field: field.to_string(),
            value,
        })
    }
}

pub(crate) fn unit_interval(field: &str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field: field.to_string(),
            value,
            min: 0.0,
            max: 1.0,
        })
    }
}
