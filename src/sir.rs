//! Compartmental SIR integration.
//!
//! The state is carried as proportions of the population:
//!
//! ```text
//! dS/dt = -β·S·I
//! dI/dt =  β·S·I - γ·I
//! dR/dt =  γ·I
//! ```
//!
//! Two fixed-step schemes are available. [`IntegrationMethod::Rk4`] (classic
//! fourth-order Runge–Kutta) is the default: it keeps the prevalence signal
//! smooth at the coarse `dt = 1` day steps the automaton runs at, where
//! forward Euler visibly overshoots the epidemic peak. [`IntegrationMethod::Euler`]
//! is kept for comparison runs.
//!
//! After every step negative compartments are clamped to zero and the triple
//! is renormalized so `S + I + R == 1`.

use serde::{Deserialize, Serialize};

use crate::error::{NumericalError, ValidationError};

/// Raw compartment magnitude beyond which a step is treated as diverged.
///
/// Proportions live in [0, 1]; a value this far outside means the scheme blew
/// up and renormalizing would only hide it.
pub const DIVERGENCE_BOUND: f64 = 1.0e6;

/// Numerical scheme used to advance the SIR state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationMethod {
    /// Forward Euler (first order).
    Euler,
    /// Classic Runge–Kutta (fourth order).
    #[default]
    Rk4,
}

/// SIR compartment proportions at time `t`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SirState {
    /// Susceptible proportion.
    pub s: f64,
    /// Infected proportion.
    pub i: f64,
    /// Recovered proportion.
    pub r: f64,
    /// Simulation time.
    pub t: f64,
}

impl SirState {
    /// Creates the conventional initial state `(1 - I₀, I₀, 0)` at `t = 0`.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InitialInfectedOutOfRange` unless `I₀ ∈ (0, 1]`.
    pub fn initial(i0: f64) -> Result<Self, ValidationError> {
        if !(i0.is_finite() && i0 > 0.0 && i0 <= 1.0) {
            return Err(ValidationError::InitialInfectedOutOfRange { value: i0 });
        }
        Ok(Self {
            s: 1.0 - i0,
            i: i0,
            r: 0.0,
            t: 0.0,
        })
    }

    /// Sum of the three compartments.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.s + self.i + self.r
    }
}

/// Rate parameters and step size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SirParams {
    /// Transmission rate β.
    pub beta: f64,
    /// Recovery rate γ.
    pub gamma: f64,
    /// Time step.
    pub dt: f64,
}

impl SirParams {
    /// Validates that β, γ and dt are strictly positive and finite.
    pub fn validate(&self) -> Result<(), ValidationError> {
        positive("beta", self.beta)?;
        positive("gamma", self.gamma)?;
        positive("dt", self.dt)?;
        Ok(())
    }

    /// Basic reproduction number β/γ.
    #[must_use]
    pub fn r0(&self) -> f64 {
        self.beta / self.gamma
    }
}

pub(crate) fn positive(field: &str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ValidationError::NotPositive {
            field: field.to_string(),
            value,
        })
    }
}

/// Advances an [`SirState`] by one fixed step.
#[derive(Debug, Clone, Copy, Default)]
pub struct SirIntegrator {
    method: IntegrationMethod,
}

impl SirIntegrator {
    /// Creates an integrator using the given scheme.
    #[must_use]
    pub const fn new(method: IntegrationMethod) -> Self {
        Self { method }
    }

    /// Returns the scheme in use.
    #[must_use]
    pub const fn method(&self) -> IntegrationMethod {
        self.method
    }

    /// Continuous-time derivatives `(dS, dI, dR)` at `(s, i)`.
    #[must_use]
    pub fn derivatives(s: f64, i: f64, beta: f64, gamma: f64) -> (f64, f64, f64) {
        let infection = beta * s * i;
        let recovery = gamma * i;
        (-infection, infection - recovery, recovery)
    }

    /// Advances `state` by `params.dt`.
    ///
    /// `params` are assumed validated (see [`SirParams::validate`]).
    ///
    /// # Errors
    ///
    /// Returns `NumericalError::Instability` if the raw step is non-finite,
    /// exceeds [`DIVERGENCE_BOUND`], or leaves nothing to renormalize.
    pub fn step(&self, state: &SirState, params: &SirParams) -> Result<SirState, NumericalError> {
        let SirParams { beta, gamma, dt } = *params;
        let (s, i, r) = match self.method {
            IntegrationMethod::Euler => {
                let (ds, di, dr) = Self::derivatives(state.s, state.i, beta, gamma);
                (state.s + ds * dt, state.i + di * dt, state.r + dr * dt)
            }
            IntegrationMethod::Rk4 => {
                let f = |s: f64, i: f64| Self::derivatives(s, i, beta, gamma);
                let k1 = f(state.s, state.i);
                let k2 = f(state.s + k1.0 * dt * 0.5, state.i + k1.1 * dt * 0.5);
                let k3 = f(state.s + k2.0 * dt * 0.5, state.i + k2.1 * dt * 0.5);
                let k4 = f(state.s + k3.0 * dt, state.i + k3.1 * dt);
                let w = dt / 6.0;
                (
                    state.s + (k1.0 + 2.0 * k2.0 + 2.0 * k3.0 + k4.0) * w,
                    state.i + (k1.1 + 2.0 * k2.1 + 2.0 * k3.1 + k4.1) * w,
                    state.r + (k1.2 + 2.0 * k2.2 + 2.0 * k3.2 + k4.2) * w,
                )
            }
        };

        let t = state.t + dt;
        for (name, v) in [("S", s), ("I", i), ("R", r)] {
            if !v.is_finite() {
                return Err(NumericalError::Instability {
                    t,
                    reason: format!("{name} became non-finite ({v})"),
                });
            }
            if v.abs() > DIVERGENCE_BOUND {
                return Err(NumericalError::Instability {
                    t,
                    reason: format!("{name} diverged to {v:e}; reduce dt"),
                });
            }
        }

        let (s, i, r) = (s.max(0.0), i.max(0.0), r.max(0.0));
        let total = s + i + r;
        if !(total.is_finite() && total > f64::EPSILON) {
            return Err(NumericalError::Instability {
                t,
                reason: format!("compartment total {total} cannot be renormalized"),
            });
        }

        Ok(SirState {
            s: s / total,
            i: i / total,
            r: r / total,
            t,
        })
    }
}
