//! Simulation configuration.
//!
//! A [`SimulationConfig`] is plain data: build it in code or load it from
//! JSON, then call [`SimulationConfig::validate`] (the orchestrator does this
//! before any work begins). Missing JSON fields take their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::automaton::{CouplingMode, InitialInfected, Placement, RuleConfig};
use crate::dimension::{BoxCounter, PatternTarget};
use crate::error::{EpiError, EpiResult, ValidationError};
use crate::sir::{IntegrationMethod, SirParams};

/// Full parameter set for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Transmission rate β.
    pub beta: f64,
    /// Recovery rate γ.
    pub gamma: f64,
    /// Time step.
    pub dt: f64,
    /// Number of steps to run.
    pub n_steps: usize,
    /// Number of cells L.
    pub grid_size: usize,
    /// Initially infected cells (count or fraction).
    pub initial_infected: InitialInfected,
    /// SIR `I₀`; derived from `initial_infected` when absent.
    pub sir_initial_infected: Option<f64>,
    /// Neighbours on each side seen by the local rule.
    pub neighborhood_radius: usize,
    /// Weight of local infection pressure.
    pub k_local: f64,
    /// Weight of global prevalence.
    pub k_global: f64,
    /// Per-step recovery probability of an infected cell.
    pub p_recover: f64,
    /// Snapshot / dimension cadence in steps.
    pub sample_interval: usize,
    /// Seed for the automaton's generator.
    pub random_seed: u64,
    /// SIR integration scheme.
    pub integration: IntegrationMethod,
    /// Form of the local/global combination.
    pub coupling: CouplingMode,
    /// Initial infected placement.
    pub placement: Placement,
    /// Pattern measured by the dimension estimator.
    pub pattern: PatternTarget,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            beta: 0.5,
            gamma: 0.1,
            dt: 1.0,
            n_steps: 150,
            grid_size: 512,
            initial_infected: InitialInfected::Count(1),
            sir_initial_infected: None,
            neighborhood_radius: 1,
            k_local: 0.8,
            k_global: 1.0,
            p_recover: 0.1,
            sample_interval: 1,
            random_seed: 42,
            integration: IntegrationMethod::Rk4,
            coupling: CouplingMode::Additive,
            placement: Placement::Random,
            pattern: PatternTarget::Infected,
        }
    }
}

impl SimulationConfig {
    /// Validates every option; returns the first violation found.
    ///
    /// # Errors
    ///
    /// Returns the offending `ValidationError`. Grids too short for a
    /// dimension fit are reported by [`crate::simulation::Simulation::new`]
    /// as an estimation error.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.sir_params().validate()?;
        if self.n_steps == 0 {
            return Err(too_small("n_steps", self.n_steps, 1));
        }
        if self.grid_size == 0 {
            return Err(too_small("grid_size", self.grid_size, 1));
        }
        if self.sample_interval == 0 {
            return Err(too_small("sample_interval", self.sample_interval, 1));
        }
        self.rule_config().validate(self.grid_size)?;
        self.initial_infected.resolve(self.grid_size)?;
        self.sir_initial_infected()?;
        Ok(())
    }

    /// Validates, including the dimension estimator's grid-length requirement.
    ///
    /// # Errors
    ///
    /// Returns `EpiError::Validation` or `EpiError::Estimation`.
    pub fn validate_all(&self) -> EpiResult<()> {
        self.validate()?;
        BoxCounter::check_len(self.grid_size)?;
        Ok(())
    }

    /// SIR rates and step.
    #[must_use]
    pub const fn sir_params(&self) -> SirParams {
        SirParams {
            beta: self.beta,
            gamma: self.gamma,
            dt: self.dt,
        }
    }

    /// Cellular automaton rule.
    #[must_use]
    pub const fn rule_config(&self) -> RuleConfig {
        RuleConfig {
            neighborhood_radius: self.neighborhood_radius,
            k_local: self.k_local,
            k_global: self.k_global,
            p_recover: self.p_recover,
            coupling: self.coupling,
        }
    }

    /// SIR `I₀`: the explicit value, or the proportion implied by `initial_infected`.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InitialInfectedOutOfRange` unless it lies in (0, 1].
    pub fn sir_initial_infected(&self) -> Result<f64, ValidationError> {
        let i0 = match self.sir_initial_infected {
            Some(v) => v,
            None if self.grid_size == 0 => 0.0,
            None => self.initial_infected.proportion(self.grid_size),
        };
        if !(i0.is_finite() && i0 > 0.0 && i0 <= 1.0) {
            return Err(ValidationError::InitialInfectedOutOfRange { value: i0 });
        }
        Ok(i0)
    }

    /// Parses a JSON document and validates it.
    ///
    /// # Errors
    ///
    /// `EpiError::Config` on malformed JSON, `EpiError::Validation` on bad values.
    pub fn from_json_str(s: &str) -> EpiResult<Self> {
        let config: Self =
            serde_json::from_str(s).map_err(|e| EpiError::config(format!("parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON file.
    ///
    /// # Errors
    ///
    /// `EpiError::Config` on I/O or parse failure, `EpiError::Validation` on bad values.
    pub fn from_json_file(path: impl AsRef<Path>) -> EpiResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| EpiError::config(format!("read {}: {e}", path.display())))?;
        Self::from_json_str(&text)
    }

    /// Serializes to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns `EpiError::Internal` if serialization fails.
    pub fn to_json_pretty(&self) -> EpiResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| EpiError::internal(format!("serialize config: {e}")))
    }

    /// Stable 32-byte digest of the configuration.
    ///
    /// Floats are hashed by bit pattern so the digest is exact.
    #[must_use]
    pub fn fingerprint(&self) -> [u8; 32] {
        let mut h = blake3::Hasher::new();
        h.update(b"episim-config-v1");
        for v in [self.beta, self.gamma, self.dt, self.k_local, self.k_global, self.p_recover] {
            h.update(&v.to_le_bytes());
        }
        for v in [self.n_steps, self.grid_size, self.neighborhood_radius, self.sample_interval] {
            h.update(&(v as u64).to_le_bytes());
        }
        h.update(&self.random_seed.to_le_bytes());
        match self.initial_infected {
            InitialInfected::Count(c) => {
                h.update(&[0]);
                h.update(&(c as u64).to_le_bytes());
            }
            InitialInfected::Fraction(f) => {
                h.update(&[1]);
                h.update(&f.to_le_bytes());
            }
        }
        match self.sir_initial_infected {
            Some(v) => {
                h.update(&[1]);
                h.update(&v.to_le_bytes());
            }
            None => {
                h.update(&[0]);
            }
        }
        h.update(&[
            self.integration as u8,
            self.coupling as u8,
            self.placement as u8,
            self.pattern as u8,
        ]);
        *h.finalize().as_bytes()
    }
}

fn too_small(field: &str, value: usize, min: usize) -> ValidationError {
    ValidationError::TooSmall {
        field: field.to_string(),
        value,
        min,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with(mutate: impl FnOnce(&mut SimulationConfig)) -> SimulationConfig {
        let mut c = SimulationConfig::default();
        mutate(&mut c);
        c
    }

    #[test]
    fn default_config_is_valid() {
        SimulationConfig::default().validate_all().unwrap();
    }

    #[test]
    fn config_rejects_each_bad_field() {
        let cases = [
            with(|c| c.beta = 0.0),
            with(|c| c.gamma = -1.0),
            with(|c| c.dt = 0.0),
            with(|c| c.n_steps = 0),
            with(|c| c.grid_size = 0),
            with(|c| c.sample_interval = 0),
            with(|c| c.neighborhood_radius = 0),
            with(|c| c.k_local = -0.5),
            with(|c| c.k_global = f64::NAN),
            with(|c| c.p_recover = 1.01),
            with(|c| c.initial_infected = InitialInfected::Count(513)),
            with(|c| c.initial_infected = InitialInfected::Fraction(-0.1)),
            with(|c| c.sir_initial_infected = Some(0.0)),
            with(|c| c.sir_initial_infected = Some(1.5)),
        ];
        for (idx, c) in cases.iter().enumerate() {
            assert!(c.validate().is_err(), "case {idx} should fail");
        }
    }

    #[test]
    fn zero_initial_count_needs_explicit_sir_i0() {
        let mut c = SimulationConfig::default();
        c.initial_infected = InitialInfected::Count(0);
        assert!(matches!(
            c.validate(),
            Err(ValidationError::InitialInfectedOutOfRange { .. })
        ));
        c.sir_initial_infected = Some(0.01);
        c.validate().unwrap();
    }

    #[test]
    fn sir_i0_is_derived_from_grid() {
        let mut c = SimulationConfig::default();
        c.grid_size = 100;
        c.initial_infected = InitialInfected::Count(5);
        assert!((c.sir_initial_infected().unwrap() - 0.05).abs() < 1e-12);
        c.initial_infected = InitialInfected::Fraction(0.2);
        assert!((c.sir_initial_infected().unwrap() - 0.2).abs() < 1e-12);
        c.sir_initial_infected = Some(0.01);
        assert!((c.sir_initial_infected().unwrap() - 0.01).abs() < 1e-12);
    }

    #[test]
    fn small_grid_fails_dimension_check() {
        let mut c = SimulationConfig::default();
        c.grid_size = 5;
        c.validate().unwrap();
        let err = c.validate_all().unwrap_err();
        assert!(err.is_estimation());
    }

    #[test]
    fn json_partial_document_uses_defaults() {
        let c = SimulationConfig::from_json_str(
            r#"{ "beta": 0.3, "grid_size": 64, "initial_infected": 0.25, "integration": "euler" }"#,
        )
        .unwrap();
        assert_eq!(c.beta, 0.3);
        assert_eq!(c.grid_size, 64);
        assert_eq!(c.initial_infected, InitialInfected::Fraction(0.25));
        assert_eq!(c.integration, IntegrationMethod::Euler);
        assert_eq!(c.gamma, SimulationConfig::default().gamma);
    }

    #[test]
    fn json_huge_radius_is_a_validation_error() {
        let err = SimulationConfig::from_json_str(r#"{ "neighborhood_radius": 18446744073709551615 }"#)
            .unwrap_err();
        assert!(matches!(
            err,
            EpiError::Validation(ValidationError::RadiusTooLarge { grid_size: 512, .. })
        ));
    }

    #[test]
    fn json_integer_is_a_count() {
        let c = SimulationConfig::from_json_str(r#"{ "initial_infected": 3 }"#).unwrap();
        assert_eq!(c.initial_infected, InitialInfected::Count(3));
    }

    #[test]
    fn json_errors_are_classified() {
        let err = SimulationConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, EpiError::Config { .. }));
        let err = SimulationConfig::from_json_str(r#"{ "gamma": 0 }"#).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn json_roundtrip_preserves_config() {
        let mut c = SimulationConfig::default();
        c.coupling = CouplingMode::Multiplicative;
        c.placement = Placement::Centered;
        c.pattern = PatternTarget::Affected;
        let json = c.to_json_pretty().unwrap();
        assert!(json.contains("\"multiplicative\""));
        assert_eq!(SimulationConfig::from_json_str(&json).unwrap(), c);
    }

    #[test]
    fn fingerprint_tracks_every_change() {
        let base = SimulationConfig::default();
        assert_eq!(base.fingerprint(), SimulationConfig::default().fingerprint());
        let mut seeded = base.clone();
        seeded.random_seed += 1;
        assert_ne!(base.fingerprint(), seeded.fingerprint());
        let mut rk = base.clone();
        rk.integration = IntegrationMethod::Euler;
        assert_ne!(base.fingerprint(), rk.fingerprint());
    }
}
