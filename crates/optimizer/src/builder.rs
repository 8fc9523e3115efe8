use crate::error::OptimizerError;
use crate::model::{Domain, LinearExpr, LinearProgram, Relation, Sense, VarId, VarKey, VarKind};
use core_types::{Period, ProblemSpec};
use itertools::Itertools;

/// Switches for the two transaction-cost mechanisms of the model.
///
/// With both on (the default) trading costs are charged twice over: once as a hard
/// leak out of the self-financing balance and once as a soft objective penalty scaled
/// by `trade_aversion`. Either can be switched off independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelOptions {
    pub hard_transaction_cost: bool,
    pub soft_trade_penalty: bool,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            hard_transaction_cost: true,
            soft_trade_penalty: true,
        }
    }
}

/// Translates a `ProblemSpec` into a `LinearProgram`.
///
/// The output is fully determined by the `ProblemSpec`: variables are created asset by asset
/// in `AssetSet` order, then period by period, and constraints are emitted in a fixed
/// order, so two builds of the same spec compare equal.
pub struct ModelBuilder<'a> {
    spec: &'a ProblemSpec,
    options: ModelOptions,
    lp: LinearProgram,
}

impl<'a> ModelBuilder<'a> {
    pub fn new(spec: &'a ProblemSpec, options: ModelOptions) -> Self {
        Self {
            spec,
            options,
            lp: LinearProgram::new(Sense::Maximize),
        }
    }

    pub fn build(mut self) -> Result<LinearProgram, OptimizerError> {
        self.define_variables();
        self.define_balance_constraints()?;
        self.define_propagation_constraints()?;
        self.define_trade_limits()?;
        self.define_weight_limits()?;
        self.define_leverage_limits()?;
        self.define_objective()?;
        Ok(self.lp)
    }

    fn define_variables(&mut self) {
        let spec = self.spec;
        let assets = spec.assets();
        let weight_periods: Vec<Period> = spec.weight_periods().collect();
        let trade_periods: Vec<Period> = spec.trade_periods().collect();

        for ((a, asset), &t) in assets.iter().cartesian_product(&weight_periods) {
            let name = format!("weight[{},{}]", asset, t);
            self.lp.add_variable(VarKey::new(VarKind::Weight, a, t), name, Domain::Free);
        }
        for ((a, asset), &t) in assets.iter().cartesian_product(&trade_periods) {
            let name = format!("trade[{},{}]", asset, t);
            self.lp.add_variable(VarKey::new(VarKind::Trade, a, t), name, Domain::Free);
        }
        for ((a, asset), &t) in assets.non_cash().cartesian_product(&trade_periods) {
            let name = format!("abs_trade[{},{}]", asset, t);
            self.lp.add_variable(VarKey::new(VarKind::AbsTrade, a, t), name, Domain::NonNegative);
        }
        for ((a, asset), &t) in assets.non_cash().cartesian_product(&trade_periods) {
            let name = format!("abs_weight[{},{}]", asset, t);
            self.lp.add_variable(VarKey::new(VarKind::AbsWeight, a, t), name, Domain::NonNegative);
        }
    }

    /// Initial condition, self-financing and post-trade normalisation.
    fn define_balance_constraints(&mut self) -> Result<(), OptimizerError> {
        let spec = self.spec;
        let assets = spec.assets();
        let cost = spec.parameters().transaction_cost;

        for (a, asset) in assets.iter() {
            let weight = self.var(VarKind::Weight, a, Period::FIRST)?;
            let initial = spec.initial_weight(a).ok_or_else(|| {
                OptimizerError::Invariant(format!("no initial weight for '{}'", asset))
            })?;
            self.lp.add_constraint(
                format!("initial[{}]", asset),
                LinearExpr::new().with(weight, 1.0),
                Relation::Eq,
                initial,
            );
        }

        for t in spec.trade_periods() {
            // Σ trade + cost·Σ|trade| = 0: whatever is bought is paid for out of cash,
            // and the cost leaks out regardless of direction.
            let mut financing = LinearExpr::new();
            for (a, _) in assets.iter() {
                financing.add_term(self.var(VarKind::Trade, a, t)?, 1.0);
            }
            if self.options.hard_transaction_cost {
                for (a, _) in assets.non_cash() {
                    financing.add_term(self.var(VarKind::AbsTrade, a, t)?, cost);
                }
            }
            self.lp.add_constraint(
                format!("self_financing[{}]", t),
                financing,
                Relation::Eq,
                0.0,
            );

            let mut post_trade = LinearExpr::new();
            for (a, _) in assets.iter() {
                post_trade.add_term(self.var(VarKind::Weight, a, t)?, 1.0);
                post_trade.add_term(self.var(VarKind::Trade, a, t)?, 1.0);
            }
            self.lp.add_constraint(
                format!("post_trade_total[{}]", t),
                post_trade,
                Relation::Eq,
                1.0,
            );
        }
        Ok(())
    }

    /// `weight[t+1] = (weight[t] + trade[t])·(1 + r[t])`, and liquidation at `T+1`.
    ///
    /// Weights are not renormalised by realised growth, so their sum drifts away from
    /// 1 by the period's aggregate return.
    fn define_propagation_constraints(&mut self) -> Result<(), OptimizerError> {
        let spec = self.spec;
        let assets = spec.assets();

        for ((a, asset), t) in assets.iter().cartesian_product(spec.trade_periods()) {
            let growth = 1.0 + self.expected_return(a, t)?;
            let expr = LinearExpr::new()
                .with(self.var(VarKind::Weight, a, t.next())?, 1.0)
                .with(self.var(VarKind::Weight, a, t)?, -growth)
                .with(self.var(VarKind::Trade, a, t)?, -growth);
            self.lp.add_constraint(
                format!("propagation[{},{}]", asset, t),
                expr,
                Relation::Eq,
                0.0,
            );
        }

        let terminal = spec.terminal_period();
        for (a, asset) in assets.non_cash() {
            let weight = self.var(VarKind::Weight, a, terminal)?;
            self.lp.add_constraint(
                format!("terminal[{}]", asset),
                LinearExpr::new().with(weight, 1.0),
                Relation::Eq,
                0.0,
            );
        }
        Ok(())
    }

    /// `abs_trade ≥ ±trade` and `abs_trade ≤ max_trade_size`.
    fn define_trade_limits(&mut self) -> Result<(), OptimizerError> {
        let spec = self.spec;
        let max_trade_size = spec.parameters().max_trade_size;

        for ((a, asset), t) in spec.assets().non_cash().cartesian_product(spec.trade_periods()) {
            let trade = self.var(VarKind::Trade, a, t)?;
            let abs_trade = self.var(VarKind::AbsTrade, a, t)?;
            self.add_abs_pair("abs_trade", asset.as_str(), t, abs_trade, trade);
            self.lp.add_constraint(
                format!("max_trade_size[{},{}]", asset, t),
                LinearExpr::new().with(abs_trade, 1.0),
                Relation::Le,
                max_trade_size,
            );
        }
        Ok(())
    }

    /// Per-asset weight bounds and the cash floor, over every weight period.
    fn define_weight_limits(&mut self) -> Result<(), OptimizerError> {
        let spec = self.spec;
        let assets = spec.assets();
        let params = spec.parameters();

        for ((a, asset), t) in assets.non_cash().cartesian_product(spec.weight_periods()) {
            let weight = self.var(VarKind::Weight, a, t)?;
            self.lp.add_constraint(
                format!("min_weight[{},{}]", asset, t),
                LinearExpr::new().with(weight, 1.0),
                Relation::Ge,
                params.min_weight,
            );
            self.lp.add_constraint(
                format!("max_weight[{},{}]", asset, t),
                LinearExpr::new().with(weight, 1.0),
                Relation::Le,
                params.max_weight,
            );
        }

        let cash = assets.cash_index();
        for t in spec.weight_periods() {
            let weight = self.var(VarKind::Weight, cash, t)?;
            self.lp.add_constraint(
                format!("min_cash_balance[{}]", t),
                LinearExpr::new().with(weight, 1.0),
                Relation::Ge,
                params.min_cash_balance,
            );
        }
        Ok(())
    }

    /// `abs_weight ≥ ±weight` and `Σ abs_weight ≤ max_leverage` per trade period.
    fn define_leverage_limits(&mut self) -> Result<(), OptimizerError> {
        let spec = self.spec;
        let max_leverage = spec.parameters().max_leverage;

        for t in spec.trade_periods() {
            let mut gross = LinearExpr::new();
            for (a, asset) in spec.assets().non_cash() {
                let weight = self.var(VarKind::Weight, a, t)?;
                let abs_weight = self.var(VarKind::AbsWeight, a, t)?;
                self.add_abs_pair("abs_weight", asset.as_str(), t, abs_weight, weight);
                gross.add_term(abs_weight, 1.0);
            }
            self.lp.add_constraint(
                format!("max_leverage[{}]", t),
                gross,
                Relation::Le,
                max_leverage,
            );
        }
        Ok(())
    }

    /// maximise `weight[cash,T+1] − trade_aversion·transaction_cost·Σ abs_trade`
    fn define_objective(&mut self) -> Result<(), OptimizerError> {
        let spec = self.spec;
        let params = spec.parameters();
        let cash = spec.assets().cash_index();

        let mut objective =
            LinearExpr::new().with(self.var(VarKind::Weight, cash, spec.terminal_period())?, 1.0);

        let penalty = params.trade_aversion * params.transaction_cost;
        if self.options.soft_trade_penalty && penalty != 0.0 {
            for ((a, _), t) in spec.assets().non_cash().cartesian_product(spec.trade_periods()) {
                objective.add_term(self.var(VarKind::AbsTrade, a, t)?, -penalty);
            }
        }

        self.lp.set_objective(objective);
        Ok(())
    }

    /// `aux − x ≥ 0` and `aux + x ≥ 0`, i.e. `aux ≥ |x|`.
    fn add_abs_pair(&mut self, label: &str, asset: &str, t: Period, aux: VarId, x: VarId) {
        self.lp.add_constraint(
            format!("{}_pos[{},{}]", label, asset, t),
            LinearExpr::new().with(aux, 1.0).with(x, -1.0),
            Relation::Ge,
            0.0,
        );
        self.lp.add_constraint(
            format!("{}_neg[{},{}]", label, asset, t),
            LinearExpr::new().with(aux, 1.0).with(x, 1.0),
            Relation::Ge,
            0.0,
        );
    }

    fn var(&self, kind: VarKind, asset: usize, period: Period) -> Result<VarId, OptimizerError> {
        self.lp
            .var(&VarKey::new(kind, asset, period))
            .ok_or_else(|| {
                OptimizerError::Invariant(format!(
                    "no {} variable for asset #{} in period {}",
                    kind.label(),
                    asset,
                    period
                ))
            })
    }

    fn expected_return(&self, asset: usize, period: Period) -> Result<f64, OptimizerError> {
        self.spec.expected_return(asset, period).ok_or_else(|| {
            OptimizerError::Invariant(format!(
                "no forecast for asset #{} in period {}",
                asset, period
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Relation;
    use core_types::{OptimizationRequest, ParameterOverrides};

    fn spec(transaction_cost: f64) -> ProblemSpec {
        let request: OptimizationRequest = serde_json::from_value(serde_json::json!({
            "initial_weights": {"GOOG": 0.2, "CASH": 0.8},
            "estimated_returns": {"GOOG": {"1": 0.05, "2": -0.02}},
            "parameters": {"transaction_cost": transaction_cost, "trade_aversion": 2.0}
        }))
        .unwrap();
        ProblemSpec::from_request(&request).unwrap()
    }

    fn constraint<'a>(lp: &'a LinearProgram, name: &str) -> &'a crate::model::Constraint {
        lp.constraints()
            .iter()
            .find(|c| c.name == name)
            .unwrap_or_else(|| panic!("missing constraint {}", name))
    }

    fn coef(lp: &LinearProgram, expr: &LinearExpr, var: &str) -> f64 {
        expr.terms()
            .iter()
            .filter(|(id, _)| lp.variable(*id).name == var)
            .map(|(_, c)| c)
            .sum()
    }

    #[test]
    fn test_variable_and_constraint_counts() {
        let lp = ModelBuilder::new(&spec(0.01), ModelOptions::default()).build().unwrap();

        // 2 assets, 1 non-cash, T = 2:
        // weights 2·3 + trades 2·2 + abs_trade 1·2 + abs_weight 1·2
        assert_eq!(lp.num_variables(), 14);
        // initial 2, self_financing 2, post_trade_total 2, propagation 4, terminal 1,
        // abs_trade pairs 4, max_trade_size 2, weight bounds 6, cash floor 3,
        // abs_weight pairs 4, leverage 2
        assert_eq!(lp.num_constraints(), 32);
    }

    #[test]
    fn test_build_is_deterministic() {
        let spec = spec(0.01);
        let first = ModelBuilder::new(&spec, ModelOptions::default()).build().unwrap();
        let second = ModelBuilder::new(&spec, ModelOptions::default()).build().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.to_string(), second.to_string());
    }

    #[test]
    fn test_propagation_uses_forecast_growth() {
        let lp = ModelBuilder::new(&spec(0.01), ModelOptions::default()).build().unwrap();

        let c = constraint(&lp, "propagation[GOOG,1]");
        assert_eq!(c.relation, Relation::Eq);
        assert_eq!(coef(&lp, &c.expr, "weight[GOOG,2]"), 1.0);
        assert_eq!(coef(&lp, &c.expr, "weight[GOOG,1]"), -1.05);
        assert_eq!(coef(&lp, &c.expr, "trade[GOOG,1]"), -1.05);

        let cash = constraint(&lp, "propagation[CASH,2]");
        assert_eq!(coef(&lp, &cash.expr, "weight[CASH,2]"), -1.0);
        assert_eq!(coef(&lp, &cash.expr, "trade[CASH,2]"), -1.0);
    }

    #[test]
    fn test_self_financing_charges_cost_on_absolute_trade() {
        let lp = ModelBuilder::new(&spec(0.01), ModelOptions::default()).build().unwrap();
        let c = constraint(&lp, "self_financing[1]");
        assert_eq!(coef(&lp, &c.expr, "trade[GOOG,1]"), 1.0);
        assert_eq!(coef(&lp, &c.expr, "trade[CASH,1]"), 1.0);
        assert_eq!(coef(&lp, &c.expr, "abs_trade[GOOG,1]"), 0.01);
        assert_eq!(c.rhs, 0.0);

        let c = constraint(&lp, "terminal[GOOG]");
        assert_eq!(coef(&lp, &c.expr, "weight[GOOG,3]"), 1.0);
        assert_eq!(c.rhs, 0.0);

        let c = constraint(&lp, "max_trade_size[GOOG,2]");
        assert_eq!(c.relation, Relation::Le);
        assert_eq!(c.rhs, 1.0);
    }

    #[test]
    fn test_objective_combines_terminal_cash_and_penalty() {
        let lp = ModelBuilder::new(&spec(0.01), ModelOptions::default()).build().unwrap();
        let objective = &lp.objective().expr;
        assert_eq!(coef(&lp, objective, "weight[CASH,3]"), 1.0);
        assert_eq!(coef(&lp, objective, "abs_trade[GOOG,1]"), -0.02);
        assert_eq!(coef(&lp, objective, "abs_trade[GOOG,2]"), -0.02);
    }

    #[test]
    fn test_cost_mechanisms_can_be_switched_off() {
        let options = ModelOptions {
            hard_transaction_cost: false,
            soft_trade_penalty: false,
        };
        let lp = ModelBuilder::new(&spec(0.01), options).build().unwrap();

        let c = constraint(&lp, "self_financing[2]");
        assert_eq!(coef(&lp, &c.expr, "abs_trade[GOOG,2]"), 0.0);
        assert_eq!(lp.objective().expr.terms().len(), 1);
    }

    #[test]
    fn test_parameters_flow_into_bounds() {
        let spec = spec(0.01)
            .with_overrides(&ParameterOverrides {
                min_weight: Some(-0.3),
                max_weight: Some(0.4),
                min_cash_balance: Some(0.05),
                max_leverage: Some(0.7),
                ..Default::default()
            })
            .unwrap();
        let lp = ModelBuilder::new(&spec, ModelOptions::default()).build().unwrap();

        assert_eq!(constraint(&lp, "min_weight[GOOG,3]").rhs, -0.3);
        assert_eq!(constraint(&lp, "max_weight[GOOG,1]").rhs, 0.4);
        assert_eq!(constraint(&lp, "min_cash_balance[3]").rhs, 0.05);
        assert_eq!(constraint(&lp, "max_leverage[2]").rhs, 0.7);
        assert_eq!(constraint(&lp, "initial[GOOG]").rhs, 0.2);
    }
}
