//! Run output: the three series handed to external consumers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::automaton::{CellState, Grid};
use crate::config::SimulationConfig;
use crate::dimension::DimensionSample;
use crate::error::{EpiError, EpiResult};
use crate::sir::SirState;

/// Whether the run reached `n_steps`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    /// Every step completed.
    Complete,
    /// The loop aborted; series stop before `failed_step`.
    Incomplete {
        /// Zero-based index of the step that failed.
        failed_step: usize,
    },
}

/// Grid copy taken at a sampling instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSnapshot {
    /// Steps completed when the snapshot was taken.
    pub step: usize,
    /// Simulation time.
    pub t: f64,
    /// The cells.
    pub grid: Grid,
}

/// Provenance of a run. Not part of [`RunResult::fingerprint`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Configuration the run used.
    pub config: SimulationConfig,
    /// Hex digest of `config`.
    pub config_fingerprint: String,
    /// Wall-clock start.
    pub started_at: DateTime<Utc>,
    /// Wall-clock end.
    pub finished_at: DateTime<Utc>,
}

/// Output of one run. Immutable once returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Identifier derived from the configuration fingerprint.
    pub run_id: Uuid,
    /// Completion status.
    pub status: RunStatus,
    /// SIR state at `t = 0` followed by one entry per completed step.
    pub sir_series: Vec<SirState>,
    /// Grid snapshots at sampling instants.
    pub snapshots: Vec<GridSnapshot>,
    /// Similarity dimension at the same instants as `snapshots`.
    pub dimensions: Vec<DimensionSample>,
    /// Provenance.
    pub metadata: RunMetadata,
}

impl RunResult {
    /// Returns true if every step completed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status == RunStatus::Complete
    }

    /// Last SIR state recorded.
    #[must_use]
    pub fn final_state(&self) -> Option<&SirState> {
        self.sir_series.last()
    }

    /// Last grid snapshot recorded.
    #[must_use]
    pub fn final_grid(&self) -> Option<&Grid> {
        self.snapshots.last().map(|s| &s.grid)
    }

    /// `(t, I)` at the epidemic peak.
    #[must_use]
    pub fn peak_prevalence(&self) -> Option<(f64, f64)> {
        self.sir_series
            .iter()
            .max_by(|a, b| a.i.total_cmp(&b.i))
            .map(|s| (s.t, s.i))
    }

    /// `(t, count)` of cells in `state` for every snapshot.
    #[must_use]
    pub fn cell_counts(&self, state: CellState) -> Vec<(f64, usize)> {
        self.snapshots
            .iter()
            .map(|s| (s.t, s.grid.count(state)))
            .collect()
    }

    /// Hex blake3 digest of the series and snapshots.
    ///
    /// Two runs with identical configuration (seed included) produce the
    /// same fingerprint; timestamps are excluded.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut h = blake3::Hasher::new();
        h.update(b"episim-run-v1");
        h.update(&(self.sir_series.len() as u64).to_le_bytes());
        for s in &self.sir_series {
            for v in [s.s, s.i, s.r, s.t] {
                h.update(&v.to_le_bytes());
            }
        }
        h.update(&(self.snapshots.len() as u64).to_le_bytes());
        for snap in &self.snapshots {
            h.update(&(snap.step as u64).to_le_bytes());
            h.update(&snap.t.to_le_bytes());
            let cells: Vec<u8> = snap.grid.cells().iter().map(|c| c.as_u8()).collect();
            h.update(&cells);
        }
        h.update(&(self.dimensions.len() as u64).to_le_bytes());
        for d in &self.dimensions {
            h.update(&(d.step as u64).to_le_bytes());
            h.update(&d.t.to_le_bytes());
            h.update(&d.dimension.to_le_bytes());
        }
        h.finalize().to_hex().to_string()
    }

    /// Serialize to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns `EpiError::Internal` if serialization fails.
    pub fn to_json_pretty(&self) -> EpiResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| EpiError::internal(format!("serialize run: {e}")))
    }

    /// Deserialize from JSON.
    ///
    /// # Errors
    ///
    /// Returns `EpiError::Config` if the document is malformed.
    pub fn from_json(s: &str) -> EpiResult<Self> {
        serde_json::from_str(s).map_err(|e| EpiError::config(format!("deserialize run: {e}")))
    }
}

/// Upper bound on steps whose series storage is reserved up front.
const MAX_PREALLOCATED_STEPS: usize = 1 << 20;

/// Series accumulated while the loop runs.
#[derive(Debug, Default)]
pub(crate) struct RunAccumulator {
    pub(crate) sir_series: Vec<SirState>,
    pub(crate) snapshots: Vec<GridSnapshot>,
    pub(crate) dimensions: Vec<DimensionSample>,
}

impl RunAccumulator {
    pub(crate) fn with_capacity(n_steps: usize, sample_interval: usize) -> Self {
        // Reservation only; the vectors still grow past the cap.
        let n_steps = n_steps.min(MAX_PREALLOCATED_STEPS);
        let samples = n_steps / sample_interval.max(1) + 1;
        Self {
            sir_series: Vec::with_capacity(n_steps + 1),
            snapshots: Vec::with_capacity(samples),
            dimensions: Vec::with_capacity(samples),
        }
    }

    pub(crate) fn finish(
        self,
        run_id: Uuid,
        status: RunStatus,
        metadata: RunMetadata,
    ) -> RunResult {
        RunResult {
            run_id,
            status,
            sir_series: self.sir_series,
            snapshots: self.snapshots,
            dimensions: self.dimensions,
            metadata,
        }
    }
}
