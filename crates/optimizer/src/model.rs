//! The linear program as plain data.
//!
//! Variables are addressed by a composite `(kind, asset, period)` key so the model
//! scales with whatever universe and horizon a request brings. Nothing in here knows
//! about any particular solver; adapters translate a `LinearProgram` into their own
//! input format.

use core_types::Period;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VarKind {
    /// Portfolio weight at the start of a period.
    Weight,
    /// Signed trade at the start of a period.
    Trade,
    /// Linearised `|trade|`.
    AbsTrade,
    /// Linearised `|weight|`, used by the leverage cap.
    AbsWeight,
}

impl VarKind {
    pub fn label(&self) -> &'static str {
        match self {
            VarKind::Weight => "weight",
            VarKind::Trade => "trade",
            VarKind::AbsTrade => "abs_trade",
            VarKind::AbsWeight => "abs_weight",
        }
    }
}

/// Composite lookup key of a decision variable. `asset` is the position in the
/// problem's `AssetSet`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarKey {
    pub kind: VarKind,
    pub asset: usize,
    pub period: Period,
}

impl VarKey {
    pub fn new(kind: VarKind, asset: usize, period: Period) -> Self {
        Self { kind, asset, period }
    }
}

/// Column index of a variable in the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    Free,
    NonNegative,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub key: VarKey,
    pub name: String,
    pub domain: Domain,
}

/// `Σ coef·x`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    terms: Vec<(VarId, f64)>,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style `add_term`.
    pub fn with(mut self, var: VarId, coef: f64) -> Self {
        self.add_term(var, coef);
        self
    }

    pub fn add_term(&mut self, var: VarId, coef: f64) {
        self.terms.push((var, coef));
    }

    pub fn terms(&self) -> &[(VarId, f64)] {
        &self.terms
    }

    pub fn evaluate(&self, assignment: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(var, coef)| coef * assignment.get(var.0).copied().unwrap_or(0.0))
            .sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Eq,
    Le,
    Ge,
}

impl Relation {
    pub fn symbol(&self) -> &'static str {
        match self {
            Relation::Eq => "=",
            Relation::Le => "<=",
            Relation::Ge => ">=",
        }
    }
}

/// `expr (=|<=|>=) rhs`
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub name: String,
    pub expr: LinearExpr,
    pub relation: Relation,
    pub rhs: f64,
}

impl Constraint {
    /// Signed violation of the constraint under `assignment`; zero when satisfied.
    pub fn violation(&self, assignment: &[f64]) -> f64 {
        let lhs = self.expr.evaluate(assignment);
        match self.relation {
            Relation::Eq => (lhs - self.rhs).abs(),
            Relation::Le => (lhs - self.rhs).max(0.0),
            Relation::Ge => (self.rhs - lhs).max(0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Maximize,
    Minimize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Objective {
    pub sense: Sense,
    pub expr: LinearExpr,
}

/// Variables, constraints and objective of one request. Built once, solved once.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearProgram {
    variables: Vec<Variable>,
    index: HashMap<VarKey, VarId>,
    constraints: Vec<Constraint>,
    objective: Objective,
}

impl LinearProgram {
    pub fn new(sense: Sense) -> Self {
        Self {
            variables: Vec::new(),
            index: HashMap::new(),
            constraints: Vec::new(),
            objective: Objective {
                sense,
                expr: LinearExpr::new(),
            },
        }
    }

    /// Adds a variable, or returns the existing one registered under `key`.
    pub fn add_variable(&mut self, key: VarKey, name: String, domain: Domain) -> VarId {
        if let Some(&id) = self.index.get(&key) {
            return id;
        }
        let id = VarId(self.variables.len());
        self.variables.push(Variable { key, name, domain });
        self.index.insert(key, id);
        id
    }

    pub fn var(&self, key: &VarKey) -> Option<VarId> {
        self.index.get(key).copied()
    }

    pub fn add_constraint(
        &mut self,
        name: String,
        expr: LinearExpr,
        relation: Relation,
        rhs: f64,
    ) {
        self.constraints.push(Constraint {
            name,
            expr,
            relation,
            rhs,
        });
    }

    pub fn set_objective(&mut self, expr: LinearExpr) {
        self.objective.expr = expr;
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, id: VarId) -> &Variable {
        &self.variables[id.0]
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn objective_value(&self, assignment: &[f64]) -> f64 {
        self.objective.expr.evaluate(assignment)
    }

    /// Largest constraint or domain violation of `assignment`.
    pub fn max_violation(&self, assignment: &[f64]) -> f64 {
        let constraints = self
            .constraints
            .iter()
            .map(|c| c.violation(assignment))
            .fold(0.0, f64::max);
        let domains = self
            .variables
            .iter()
            .zip(assignment)
            .filter(|(v, _)| v.domain == Domain::NonNegative)
            .map(|(_, x)| (-x).max(0.0))
            .fold(0.0, f64::max);
        constraints.max(domains)
    }

    fn write_expr(&self, f: &mut fmt::Formatter<'_>, expr: &LinearExpr) -> fmt::Result {
        if expr.terms().is_empty() {
            return write!(f, "0");
        }
        for (i, (var, coef)) in expr.terms().iter().enumerate() {
            let sign = if *coef < 0.0 { "-" } else { "+" };
            if i == 0 && sign == "+" {
                write!(f, "{} {}", coef.abs(), self.variables[var.0].name)?;
            } else {
                write!(f, " {} {} {}", sign, coef.abs(), self.variables[var.0].name)?;
            }
        }
        Ok(())
    }
}

/// CPLEX-LP-flavoured text dump; identical programs print identically.
impl fmt::Display for LinearProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.objective.sense {
            Sense::Maximize => writeln!(f, "Maximize")?,
            Sense::Minimize => writeln!(f, "Minimize")?,
        }
        write!(f, "  obj: ")?;
        self.write_expr(f, &self.objective.expr)?;
        writeln!(f)?;

        writeln!(f, "Subject To")?;
        for c in &self.constraints {
            write!(f, "  {}: ", c.name)?;
            self.write_expr(f, &c.expr)?;
            writeln!(f, " {} {}", c.relation.symbol(), c.rhs)?;
        }

        writeln!(f, "Bounds")?;
        for v in &self.variables {
            match v.domain {
                Domain::Free => writeln!(f, "  {} free", v.name)?,
                Domain::NonNegative => writeln!(f, "  {} >= 0", v.name)?,
            }
        }
        writeln!(f, "End")
    }
}
