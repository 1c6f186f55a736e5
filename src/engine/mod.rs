//! The explanation engine.
//!
//! The engine drives rounds of feature summarization, pattern selection,
//! candidate scoring, and refinement-input generation until the top
//! candidate converges or the iteration budget runs out. Its control is
//! an explicit bounded state machine:
//!
//! ```text
//! Init -> Evaluating -> (Refining <-> Evaluating) -> Converged | Exhausted
//! ```
//!
//! Both terminal states return a [`Diagnosis`]; `Exhausted` yields the
//! best explanation found so far, explicitly marked as not converged.
//!
//! Each `explain()` call owns an isolated pool, iteration counter, and
//! candidate bank; nothing persists between calls except the immutable
//! pattern catalog.

pub mod diagnosis;
pub mod explainer;

pub use diagnosis::{equivalent_formulas, Diagnosis};
pub use explainer::{Explainer, ExplainerBuilder};

/// Phases of one `explain()` run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Loading grammar, labeling seeds, counter at zero.
    Init,
    /// Selecting and scoring candidates over the frozen pool.
    Evaluating,
    /// Generating and labeling refinement inputs.
    Refining,
    /// The top candidate met the convergence thresholds.
    Converged,
    /// Iteration budget or catalog exhausted before convergence.
    Exhausted,
}

impl EngineState {
    /// True for the two terminal states.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EngineState::Converged | EngineState::Exhausted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_final_states_are_terminal() {
        assert!(EngineState::Converged.is_terminal());
        assert!(EngineState::Exhausted.is_terminal());
        assert!(!EngineState::Init.is_terminal());
        assert!(!EngineState::Evaluating.is_terminal());
        assert!(!EngineState::Refining.is_terminal());
    }
}
