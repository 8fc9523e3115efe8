//! # Horizon Optimizer
//!
//! Builds, solves and reads back the multi-period rebalancing linear program.
//!
//! ## Pipeline
//!
//! `ProblemSpec` → `ModelBuilder` → `LpSolver` → `ResultExtractor` → `PlanResponse`
//!
//! Every request gets its own `LinearProgram`; the only thing shared between
//! requests is the (stateless) solver, so `Optimizer` can be used from many threads
//! at once.

use configuration::{Config, ModelSettings};
use core_types::{OptimizationRequest, Parameters, ProblemSpec, ValidationError};
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

pub mod builder;
pub mod clarabel_solver;
pub mod error;
pub mod extractor;
pub mod model;
pub mod solver;

// Re-export the key components to create a clean, public-facing API.
pub use builder::{ModelBuilder, ModelOptions};
pub use clarabel_solver::ClarabelSolver;
pub use error::{OptimizerError, SolverError};
pub use extractor::{PlanResponse, PlanTables, ResultExtractor, STATUS_NOT_OPTIMAL, STATUS_OPTIMAL};
pub use model::LinearProgram;
pub use solver::{LpSolver, SolveOutcome, SolveStatus};

impl From<&ModelSettings> for ModelOptions {
    fn from(settings: &ModelSettings) -> Self {
        Self {
            hard_transaction_cost: settings.hard_transaction_cost,
            soft_trade_penalty: settings.soft_trade_penalty,
        }
    }
}

/// Runs the whole pipeline for one request at a time.
#[derive(Clone)]
pub struct Optimizer {
    solver: Arc<dyn LpSolver>,
    options: ModelOptions,
    extractor: ResultExtractor,
    defaults: Parameters,
    weight_sum_tolerance: f64,
    retry_on_failure: bool,
}

impl Optimizer {
    /// An optimizer with built-in defaults around the given solver.
    pub fn new(solver: Arc<dyn LpSolver>) -> Self {
        let model = ModelSettings::default();
        Self {
            solver,
            options: ModelOptions::default(),
            extractor: ResultExtractor::default(),
            defaults: model.defaults,
            weight_sum_tolerance: model.weight_sum_tolerance,
            retry_on_failure: true,
        }
    }

    /// The Clarabel-backed optimizer described by the application configuration.
    pub fn from_config(config: &Config) -> Self {
        let solver = Arc::new(ClarabelSolver::new(config.solver.clone()));
        Self {
            solver,
            options: ModelOptions::from(&config.model),
            extractor: ResultExtractor::new(
                config.model.output_precision,
                config.solver.accept_reduced_accuracy,
            ),
            defaults: config.model.defaults,
            weight_sum_tolerance: config.model.weight_sum_tolerance,
            retry_on_failure: config.solver.retry_on_failure,
        }
    }

    pub fn with_model_options(mut self, options: ModelOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_extractor(mut self, extractor: ResultExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_retry(mut self, retry_on_failure: bool) -> Self {
        self.retry_on_failure = retry_on_failure;
        self
    }

    pub fn solver_name(&self) -> &'static str {
        self.solver.name()
    }

    /// Turns a raw request into a `ProblemSpec` using this optimizer's defaults.
    pub fn validate(&self, request: &OptimizationRequest) -> Result<ProblemSpec, ValidationError> {
        ProblemSpec::from_request_with(request, &self.defaults, self.weight_sum_tolerance)
    }

    pub fn build_model(&self, spec: &ProblemSpec) -> Result<LinearProgram, OptimizerError> {
        ModelBuilder::new(spec, self.options).build()
    }

    /// Validates and solves. Validation failures are returned before any model is built.
    pub fn run_request(
        &self,
        request: &OptimizationRequest,
    ) -> Result<PlanResponse, OptimizerError> {
        let spec = self.validate(request)?;
        self.run(&spec)
    }

    /// Builds, solves and extracts the plan for `spec`.
    ///
    /// An infeasible or otherwise non-optimal program is `Ok` with status `1`. Only a
    /// failing solver or a broken internal invariant is an `Err`.
    pub fn run(&self, spec: &ProblemSpec) -> Result<PlanResponse, OptimizerError> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("optimize", %request_id, solver = self.solver.name());
        let _enter = span.enter();

        let started = Instant::now();
        let lp = self.build_model(spec)?;
        tracing::debug!(
            assets = spec.assets().len(),
            horizon = spec.horizon(),
            variables = lp.num_variables(),
            constraints = lp.num_constraints(),
            "Built linear program."
        );

        let outcome = self.solve_with_retry(&lp)?;
        let response = self.extractor.extract(spec, &lp, &outcome).inspect_err(|e| {
            tracing::error!(error = %e, "Failed to extract the plan.");
        })?;

        tracing::info!(
            status = ?outcome.status,
            code = response.status,
            iterations = outcome.iterations,
            solve_ms = outcome.solve_time.as_millis() as u64,
            total_ms = started.elapsed().as_millis() as u64,
            "Optimization finished."
        );
        Ok(response)
    }

    /// Solves independent problems in parallel. Results keep the input order.
    pub fn run_batch(&self, specs: &[ProblemSpec]) -> Vec<Result<PlanResponse, OptimizerError>> {
        self.run_batch_with(specs, || {})
    }

    /// `run_batch`, calling `on_done` from the worker thread as each problem finishes.
    pub fn run_batch_with<F>(
        &self,
        specs: &[ProblemSpec],
        on_done: F,
    ) -> Vec<Result<PlanResponse, OptimizerError>>
    where
        F: Fn() + Sync,
    {
        tracing::info!(
            problems = specs.len(),
            threads = rayon::current_num_threads(),
            "Starting batch optimization."
        );
        specs
            .par_iter()
            .map(|spec| {
                let result = self.run(spec);
                on_done();
                result
            })
            .collect()
    }

    /// One solve, plus at most one retry of the solve call when the backend itself
    /// fails. Status outcomes (infeasible, time limit, ...) are never retried.
    fn solve_with_retry(&self, lp: &LinearProgram) -> Result<SolveOutcome, OptimizerError> {
        match self.solver.solve(lp) {
            Ok(outcome) => Ok(outcome),
            Err(e) if self.retry_on_failure => {
                tracing::warn!(error = %e, "Solver failed, retrying once.");
                Ok(self.solver.solve(lp)?)
            }
            Err(e) => Err(e.into()),
        }
    }
}
