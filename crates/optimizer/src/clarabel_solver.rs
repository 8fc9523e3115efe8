use crate::error::SolverError;
use crate::model::{Domain, LinearProgram, Relation, Sense};
use crate::solver::{LpSolver, SolveOutcome, SolveStatus};
use clarabel::algebra::*;
use clarabel::solver::*;
use configuration::SolverSettings;
use std::collections::BTreeMap;
use std::time::Duration;

/// `LpSolver` backed by the Clarabel interior-point solver.
///
/// Clarabel solves `min ½xᵀPx + qᵀx  s.t.  Ax + s = b, s ∈ K`. A linear program maps
/// onto it with `P = 0`, equalities in a zero cone and every inequality (variable
/// domains included) in a nonnegative cone. Maximisation is minimisation of `-q`.
#[derive(Debug, Clone)]
pub struct ClarabelSolver {
    settings: SolverSettings,
}

impl ClarabelSolver {
    pub fn new(settings: SolverSettings) -> Self {
        Self { settings }
    }
}

impl Default for ClarabelSolver {
    fn default() -> Self {
        Self::new(SolverSettings::default())
    }
}

/// `A`, `b` and the cone layout of a program in Clarabel's standard form.
struct ConicForm {
    a: CscMatrix<f64>,
    b: Vec<f64>,
    q: Vec<f64>,
    cones: Vec<SupportedConeT<f64>>,
}

impl ConicForm {
    fn from_program(lp: &LinearProgram) -> Self {
        let n = lp.num_variables();

        // Equality rows first (zero cone), then inequality rows (nonnegative cone).
        let equalities: Vec<_> = lp
            .constraints()
            .iter()
            .filter(|c| c.relation == Relation::Eq)
            .collect();
        let inequalities: Vec<_> = lp
            .constraints()
            .iter()
            .filter(|c| c.relation != Relation::Eq)
            .collect();

        // (column, row) -> coefficient, summing repeated terms.
        let mut entries: BTreeMap<(usize, usize), f64> = BTreeMap::new();
        let mut b = Vec::with_capacity(lp.num_constraints() + n);
        let mut row = 0;

        for c in equalities.iter().chain(inequalities.iter()) {
            // `a·x <= b` is already in standard form; `a·x >= b` becomes `-a·x <= -b`.
            let sign = if c.relation == Relation::Ge { -1.0 } else { 1.0 };
            for (var, coef) in c.expr.terms() {
                *entries.entry((var.index(), row)).or_insert(0.0) += sign * coef;
            }
            b.push(sign * c.rhs);
            row += 1;
        }

        // x >= 0 as -x <= 0
        for (col, variable) in lp.variables().iter().enumerate() {
            if variable.domain == Domain::NonNegative {
                entries.insert((col, row), -1.0);
                b.push(0.0);
                row += 1;
            }
        }

        let m = row;
        let mut colptr = Vec::with_capacity(n + 1);
        let mut rowval = Vec::with_capacity(entries.len());
        let mut nzval = Vec::with_capacity(entries.len());
        colptr.push(0);
        let mut col = 0;
        for ((c, r), value) in entries {
            if value == 0.0 {
                continue;
            }
            while col < c {
                colptr.push(rowval.len());
                col += 1;
            }
            rowval.push(r);
            nzval.push(value);
        }
        while col < n {
            colptr.push(rowval.len());
            col += 1;
        }

        let mut cones = Vec::new();
        if !equalities.is_empty() {
            cones.push(ZeroConeT(equalities.len()));
        }
        if m > equalities.len() {
            cones.push(NonnegativeConeT(m - equalities.len()));
        }

        let mut q = vec![0.0; n];
        for (var, coef) in lp.objective().expr.terms() {
            q[var.index()] += coef;
        }
        if lp.objective().sense == Sense::Maximize {
            q.iter_mut().for_each(|v| *v = -*v);
        }

        Self {
            a: CscMatrix::new(m, n, colptr, rowval, nzval),
            b,
            q,
            cones,
        }
    }
}

fn map_status(status: SolverStatus) -> SolveStatus {
    match status {
        SolverStatus::Solved => SolveStatus::Optimal,
        SolverStatus::AlmostSolved => SolveStatus::ReducedAccuracy,
        SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
            SolveStatus::Infeasible
        }
        SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => {
            SolveStatus::Unbounded
        }
        SolverStatus::MaxIterations => SolveStatus::IterationLimit,
        SolverStatus::MaxTime => SolveStatus::TimeLimit,
        _ => SolveStatus::NumericalTrouble,
    }
}

impl LpSolver for ClarabelSolver {
    fn name(&self) -> &'static str {
        "clarabel"
    }

    fn solve(&self, lp: &LinearProgram) -> Result<SolveOutcome, SolverError> {
        let n = lp.num_variables();
        let form = ConicForm::from_program(lp);

        // No quadratic term.
        let p = CscMatrix::new(n, n, vec![0; n + 1], Vec::new(), Vec::<f64>::new());

        let settings = DefaultSettingsBuilder::<f64>::default()
            .max_iter(self.settings.max_iter)
            .time_limit(self.settings.time_limit_secs)
            .verbose(self.settings.verbose)
            .build()
            .map_err(|e| SolverError::Setup(format!("Failed to build settings: {}", e)))?;

        let mut solver = DefaultSolver::new(&p, &form.q, &form.a, &form.b, &form.cones, settings)
            .map_err(|e| SolverError::Setup(format!("Failed to create solver: {:?}", e)))?;

        solver.solve();

        let solution = &solver.solution;
        tracing::debug!(
            status = ?solution.status,
            iterations = solution.iterations,
            solve_time = solution.solve_time,
            "Clarabel finished."
        );

        if solution.x.len() != n {
            return Err(SolverError::Backend(format!(
                "solver returned {} values for {} variables",
                solution.x.len(),
                n
            )));
        }

        Ok(SolveOutcome {
            status: map_status(solution.status),
            assignment: solution.x.clone(),
            iterations: solution.iterations,
            solve_time: Duration::from_secs_f64(solution.solve_time.max(0.0)),
        })
    }
}
