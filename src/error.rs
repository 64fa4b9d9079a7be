//! Error types for episim.
//!
//! All errors are strongly typed using thiserror so callers can match on
//! the failure class: bad input, too little spatial data for a dimension
//! fit, or a numerical blow-up in the SIR integrator.

use thiserror::Error;

/// Validation errors raised before any simulation work begins.
///
/// Every variant is an "invalid parameter" failure.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Parameter '{field}' must be > 0 and finite (got {value})")]
    NotPositive {
        field: String,
        value: f64,
    },

    #[error("Parameter '{field}' must be >= 0 and finite (got {value})")]
    Negative {
        field: String,
        value: f64,
    },

    #[error("Parameter '{field}' = {value} is out of range [{min}, {max}]")]
    OutOfRange {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Initial infected proportion {value} must lie in (0, 1]")]
    InitialInfectedOutOfRange {
        value: f64,
    },

    #[error("Initial infected count {count} exceeds grid size {grid_size}")]
    InitialInfectedExceedsGrid {
        count: usize,
        grid_size: usize,
    },

    #[error("Integer parameter '{field}' must be >= {min} (got {value})")]
    TooSmall {
        field: String,
        value: usize,
        min: usize,
    },

    #[error("Neighborhood radius {radius} does not fit a grid of {grid_size} cells")]
    RadiusTooLarge {
        radius: usize,
        grid_size: usize,
    },

    #[error("Simulation has already finished; create a new one to run again")]
    RunAlreadyFinished,
}

/// Errors raised by the similarity-dimension estimator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EstimationError {
    #[error("Insufficient data: grid of {grid_size} cells yields {available} box sizes, need at least {required}")]
    InsufficientData {
        grid_size: usize,
        available: usize,
        required: usize,
    },
}

/// Errors raised by the SIR integrator.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NumericalError {
    #[error("Numerical instability at t={t}: {reason}")]
    Instability {
        t: f64,
        reason: String,
    },
}

/// Top-level error type for episim.
#[derive(Debug, Error)]
pub enum EpiError {
    #[error("Invalid parameter: {0}")]
    Validation(#[from] ValidationError),

    #[error("Estimation error: {0}")]
    Estimation(#[from] EstimationError),

    #[error("Numerical error: {0}")]
    Numerical(#[from] NumericalError),

    #[error("Run aborted at step {step}: {source}")]
    Aborted {
        step: usize,
        #[source]
        source: Box<EpiError>,
    },

    #[error("Configuration error: {message}")]
    Config {
        message: String,
    },

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl EpiError {
    /// Creates a configuration (I/O or parse) error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Wraps an error raised inside the time loop with its step index.
    #[must_use]
    pub fn aborted(step: usize, source: EpiError) -> Self {
        Self::Aborted {
            step,
            source: Box::new(source),
        }
    }

    /// Returns the innermost error, looking through `Aborted`.
    #[must_use]
    pub fn root(&self) -> &EpiError {
        match self {
            Self::Aborted { source, .. } => source.root(),
            other => other,
        }
    }

    /// Returns true if the root cause is a validation error.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self.root(), Self::Validation(_))
    }

    /// Returns true if the root cause is an estimation error.
    #[must_use]
    pub fn is_estimation(&self) -> bool {
        matches!(self.root(), Self::Estimation(_))
    }

    /// Returns true if the root cause is a numerical error.
    #[must_use]
    pub fn is_numerical(&self) -> bool {
        matches!(self.root(), Self::Numerical(_))
    }

    /// Step index at which a run was aborted, if this error came from the loop.
    #[must_use]
    pub const fn failed_step(&self) -> Option<usize> {
        match self {
            Self::Aborted { step, .. } => Some(*step),
            _ => None,
        }
    }

    /// Returns true if this error is retryable.
    ///
    /// Runs are deterministic given a seed, so no failure is transient.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        false
    }
}

/// Result type alias for episim operations.
pub type EpiResult<T> = Result<T, EpiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_not_positive() {
        let err = ValidationError::NotPositive {
            field: "beta".to_string(),
            value: -0.5,
        };
        let msg = format!("{err}");
        assert!(msg.contains("beta"));
        assert!(msg.contains("-0.5"));
    }

    #[test]
    fn test_validation_error_grid_overflow() {
        let err = ValidationError::InitialInfectedExceedsGrid {
            count: 70,
            grid_size: 64,
        };
        let msg = format!("{err}");
        assert!(msg.contains("70"));
        assert!(msg.contains("64"));
    }

    #[test]
    fn test_estimation_error_message() {
        let err = EstimationError::InsufficientData {
            grid_size: 4,
            available: 2,
            required: 3,
        };
        let msg = format!("{err}");
        assert!(msg.contains("Insufficient data"));
        assert!(msg.contains("need at least 3"));
    }

    #[test]
    fn test_epi_error_from_validation() {
        let err: EpiError = ValidationError::RunAlreadyFinished.into();
        assert!(err.is_validation());
        assert!(!err.is_numerical());
        assert!(!err.is_retryable());
        assert_eq!(err.failed_step(), None);
    }

    #[test]
    fn test_aborted_exposes_step_and_root() {
        let inner: EpiError = NumericalError::Instability {
            t: 2.0,
            reason: "diverged".to_string(),
        }
        .into();
        let err = EpiError::aborted(7, inner);
        assert_eq!(err.failed_step(), Some(7));
        assert!(err.is_numerical());
        let msg = format!("{err}");
        assert!(msg.contains("step 7"));
        assert!(msg.contains("diverged"));
    }

    #[test]
    fn test_config_and_internal() {
        let err = EpiError::config("missing file");
        assert!(format!("{err}").contains("missing file"));
        let err = EpiError::internal("unexpected state");
        assert!(format!("{err}").contains("unexpected state"));
        assert!(!err.is_retryable());
    }
}
