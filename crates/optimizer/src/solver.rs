use crate::error::SolverError;
use crate::model::LinearProgram;
use std::time::Duration;

/// The LP solving capability.
///
/// Implementations wrap a specific numeric engine. They must treat every call as
/// independent: no warm starts, no state carried from one program to the next, and
/// the program is never modified.
///
/// `Send + Sync` lets one instance serve concurrent requests.
pub trait LpSolver: Send + Sync {
    /// Return the solver name for logging.
    fn name(&self) -> &'static str;

    /// Solve `lp` once.
    ///
    /// An infeasible or unbounded program is a normal outcome reported through
    /// `SolveOutcome::status`. `Err` is reserved for the engine itself failing.
    fn solve(&self, lp: &LinearProgram) -> Result<SolveOutcome, SolverError>;
}

/// How a solve ended, in solver-independent terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    Optimal,
    /// Converged only to the engine's relaxed tolerances.
    ReducedAccuracy,
    Infeasible,
    Unbounded,
    IterationLimit,
    TimeLimit,
    NumericalTrouble,
}

impl SolveStatus {
    pub fn is_optimal(&self) -> bool {
        matches!(self, SolveStatus::Optimal)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolveOutcome {
    pub status: SolveStatus,
    /// One value per program variable, in column order. Meaningless unless the
    /// status says otherwise.
    pub assignment: Vec<f64>,
    pub iterations: u32,
    pub solve_time: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_full_accuracy_is_optimal() {
        assert!(SolveStatus::Optimal.is_optimal());
        for status in [
            SolveStatus::ReducedAccuracy,
            SolveStatus::Infeasible,
            SolveStatus::Unbounded,
            SolveStatus::IterationLimit,
            SolveStatus::TimeLimit,
            SolveStatus::NumericalTrouble,
        ] {
            assert!(!status.is_optimal(), "{:?}", status);
        }
    }
}
