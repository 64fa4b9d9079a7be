//! Temporal → spatial coupling.
//!
//! The automaton only ever sees the infected proportion; S and R never leak
//! into the spatial rule.

use crate::sir::SirState;

/// Global force-of-infection signal for the automaton: the current `I`.
#[must_use]
pub fn prevalence(state: &SirState) -> f64 {
    state.i.clamp(0.0, 1.0)
}
