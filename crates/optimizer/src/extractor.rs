use crate::error::OptimizerError;
use crate::model::{LinearProgram, VarKey, VarKind};
use crate::solver::{SolveOutcome, SolveStatus};
use core_types::{AssetId, Period, ProblemSpec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `asset → period → value`
pub type PlanTable = BTreeMap<AssetId, BTreeMap<Period, f64>>;

/// Status code of an optimal plan.
pub const STATUS_OPTIMAL: u8 = 0;
/// Status code of every other outcome.
pub const STATUS_NOT_OPTIMAL: u8 = 1;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanTables {
    /// Weights over periods `1..=T+1`.
    pub weights: PlanTable,
    /// Trades over periods `1..=T`.
    pub trades: PlanTable,
}

/// The outbound body: `{"output": {"weights": .., "trades": ..}, "status": 0|1}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanResponse {
    pub output: PlanTables,
    pub status: u8,
}

impl PlanResponse {
    pub fn not_optimal() -> Self {
        Self {
            output: PlanTables::default(),
            status: STATUS_NOT_OPTIMAL,
        }
    }

    pub fn is_optimal(&self) -> bool {
        self.status == STATUS_OPTIMAL
    }

    pub fn weight(&self, asset: &str, period: u32) -> Option<f64> {
        lookup(&self.output.weights, asset, period)
    }

    pub fn trade(&self, asset: &str, period: u32) -> Option<f64> {
        lookup(&self.output.trades, asset, period)
    }
}

fn lookup(table: &PlanTable, asset: &str, period: u32) -> Option<f64> {
    table
        .get(&AssetId::new(asset))?
        .get(&Period::new(period)?)
        .copied()
}

/// Reshapes a solver assignment into per-asset, per-period tables.
#[derive(Debug, Clone, Copy)]
pub struct ResultExtractor {
    precision: u32,
    accept_reduced_accuracy: bool,
}

impl Default for ResultExtractor {
    fn default() -> Self {
        Self {
            precision: 9,
            accept_reduced_accuracy: false,
        }
    }
}

impl ResultExtractor {
    pub fn new(precision: u32, accept_reduced_accuracy: bool) -> Self {
        Self {
            precision,
            accept_reduced_accuracy,
        }
    }

    /// `0` for an optimal solve, `1` for everything else.
    pub fn status_code(&self, status: SolveStatus) -> u8 {
        let accepted = status.is_optimal()
            || (self.accept_reduced_accuracy && status == SolveStatus::ReducedAccuracy);
        if accepted { STATUS_OPTIMAL } else { STATUS_NOT_OPTIMAL }
    }

    /// Builds the response. Non-optimal outcomes yield empty tables; the assignment of
    /// such a solve is never read.
    pub fn extract(
        &self,
        spec: &ProblemSpec,
        lp: &LinearProgram,
        outcome: &SolveOutcome,
    ) -> Result<PlanResponse, OptimizerError> {
        if self.status_code(outcome.status) != STATUS_OPTIMAL {
            return Ok(PlanResponse::not_optimal());
        }
        if outcome.assignment.len() != lp.num_variables() {
            return Err(OptimizerError::Invariant(format!(
                "assignment has {} values for {} variables",
                outcome.assignment.len(),
                lp.num_variables()
            )));
        }

        let weights = self.table(spec, lp, outcome, VarKind::Weight, spec.weight_periods())?;
        let trades = self.table(spec, lp, outcome, VarKind::Trade, spec.trade_periods())?;

        Ok(PlanResponse {
            output: PlanTables { weights, trades },
            status: STATUS_OPTIMAL,
        })
    }

    fn table(
        &self,
        spec: &ProblemSpec,
        lp: &LinearProgram,
        outcome: &SolveOutcome,
        kind: VarKind,
        periods: impl Iterator<Item = Period> + Clone,
    ) -> Result<PlanTable, OptimizerError> {
        let mut table = PlanTable::new();
        for (a, asset) in spec.assets().iter() {
            let mut row = BTreeMap::new();
            for t in periods.clone() {
                let var = lp.var(&VarKey::new(kind, a, t)).ok_or_else(|| {
                    OptimizerError::Invariant(format!(
                        "no {} variable for '{}' in period {}",
                        kind.label(),
                        asset,
                        t
                    ))
                })?;
                row.insert(t, self.round(outcome.assignment[var.index()]));
            }
            table.insert(asset.clone(), row);
        }
        Ok(table)
    }

    /// Rounds to the configured precision so solver noise does not surface as tiny
    /// non-zero values, and folds `-0.0` into `0.0`.
    fn round(&self, value: f64) -> f64 {
        let scale = 10f64.powi(self.precision as i32);
        let rounded = (value * scale).round() / scale;
        if rounded == 0.0 { 0.0 } else { rounded }
    }
}
