use core_types::ValidationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OptimizerError {
    #[error("Invalid optimization request: {0}")]
    Validation(#[from] ValidationError),

    #[error("LP solver failed: {0}")]
    Solver(#[from] SolverError),

    /// Something validation should have ruled out reached the model. This is a
    /// defect, never a property of the caller's portfolio.
    #[error("Internal invariant violated: {0}")]
    Invariant(String),
}

/// The solving capability itself broke, as opposed to reporting that a plan is
/// infeasible or not optimal.
#[derive(Error, Debug, Clone)]
pub enum SolverError {
    #[error("could not set up the solver: {0}")]
    Setup(String),

    #[error("solver backend error: {0}")]
    Backend(String),
}
