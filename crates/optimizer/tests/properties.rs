//! End-to-end solves against the Clarabel backend.

use core_types::{OptimizationRequest, ParameterOverrides, ProblemSpec};
use configuration::Config;
use optimizer::{ModelOptions, Optimizer, PlanResponse};
use serde_json::json;

const TOL: f64 = 1e-5;

/// The optimizer exactly as the CLI and server build it from default settings.
fn optimizer() -> Optimizer {
    Optimizer::from_config(&Config::default())
}

fn spec(value: serde_json::Value) -> ProblemSpec {
    let request: OptimizationRequest = serde_json::from_value(value).unwrap();
    ProblemSpec::from_request(&request).unwrap()
}

fn assert_close(actual: Option<f64>, expected: f64, what: &str) {
    let actual = actual.unwrap_or_else(|| panic!("{} missing from plan", what));
    assert!(
        (actual - expected).abs() < TOL,
        "{}: expected {}, got {}",
        what,
        expected,
        actual
    );
}

/// Two non-cash assets, all cash to start, tight trading limits.
fn worked_example() -> ProblemSpec {
    spec(json!({
        "initial_weights": {"GOOG": 0.0, "APPL": 0.0, "CASH": 1.0},
        "estimated_returns": {
            "GOOG": {"1": 0.02, "2": 0.01, "3": -0.01},
            "APPL": {"1": 0.005, "2": 0.015, "3": 0.0}
        },
        "parameters": {
            "min_weight": -1, "max_weight": 0.1, "min_cash_balance": 0.1,
            "max_leverage": 1, "max_trade_size": 0.1, "trade_aversion": 1,
            "transaction_cost": 0.01
        }
    }))
}

/// A holding whose first-period gain exactly pays for its liquidation cost, which
/// pins the whole plan down: hold through period 1, sell everything in period 2.
fn forced_liquidation() -> ProblemSpec {
    spec(json!({
        "initial_weights": {"GOOG": 0.2, "CASH": 0.8},
        "estimated_returns": {"GOOG": {"1": 0.25, "2": 0.0}},
        "parameters": {"transaction_cost": 0.2}
    }))
}

/// Offsetting first-period returns keep the weights summing to 1 into period 2.
fn offsetting_pair() -> ProblemSpec {
    spec(json!({
        "initial_weights": {"GOOG": 0.2, "APPL": 0.25, "CASH": 0.55},
        "estimated_returns": {
            "GOOG": {"1": 0.25, "2": 0.25, "3": 0.0},
            "APPL": {"1": -0.2, "2": 0.25, "3": 0.0}
        },
        "parameters": {"transaction_cost": 0.2}
    }))
}

fn non_cash_turnover(spec: &ProblemSpec, plan: &PlanResponse) -> f64 {
    spec.assets()
        .non_cash()
        .flat_map(|(_, asset)| plan.output.trades[asset].values())
        .map(|trade| trade.abs())
        .sum()
}

fn assert_plan_invariants(spec: &ProblemSpec, plan: &PlanResponse) {
    assert!(plan.is_optimal());
    let params = spec.parameters();
    let terminal = spec.terminal_period().get();

    for (a, asset) in spec.assets().iter() {
        let name = asset.as_str();
        assert_close(
            plan.weight(name, 1),
            spec.initial_weight(a).unwrap(),
            &format!("weight[{},1]", name),
        );
        if !asset.is_cash() {
            assert_close(plan.weight(name, terminal), 0.0, &format!("weight[{},T+1]", name));
            for t in spec.trade_periods() {
                let trade = plan.trade(name, t.get()).unwrap();
                assert!(trade.abs() <= params.max_trade_size + TOL);
            }
        }
    }

    for t in spec.trade_periods() {
        let mut traded = 0.0;
        let mut net = 0.0;
        let mut post_trade = 0.0;
        for (_, asset) in spec.assets().iter() {
            let trade = plan.trade(asset.as_str(), t.get()).unwrap();
            net += trade;
            post_trade += plan.weight(asset.as_str(), t.get()).unwrap() + trade;
            if !asset.is_cash() {
                traded += trade.abs();
            }
        }
        assert!(
            (net + params.transaction_cost * traded).abs() < TOL,
            "self-financing violated in period {}",
            t
        );
        assert!((post_trade - 1.0).abs() < TOL, "post-trade total in period {}", t);
    }
}

#[test]
fn test_worked_example_stays_in_cash() {
    let spec = worked_example();
    let plan = optimizer().run(&spec).unwrap();

    assert_eq!(plan.status, 0);
    assert_plan_invariants(&spec, &plan);
    assert_close(plan.weight("GOOG", 4), 0.0, "weight[GOOG,4]");
    assert_close(plan.weight("APPL", 4), 0.0, "weight[APPL,4]");
    assert_close(plan.weight("CASH", 4), 1.0, "weight[CASH,4]");
    for asset in ["GOOG", "APPL", "CASH"] {
        for t in 1..=3 {
            assert!(plan.trade(asset, t).unwrap().abs() <= 0.1 + TOL);
        }
    }
}

#[test]
fn test_forced_liquidation_plan() {
    let spec = forced_liquidation();
    let plan = optimizer().run(&spec).unwrap();

    assert_plan_invariants(&spec, &plan);
    assert_close(plan.weight("GOOG", 2), 0.25, "weight[GOOG,2]");
    assert_close(plan.weight("CASH", 2), 0.8, "weight[CASH,2]");
    assert_close(plan.trade("GOOG", 1), 0.0, "trade[GOOG,1]");
    assert_close(plan.trade("GOOG", 2), -0.25, "trade[GOOG,2]");
    assert_close(plan.trade("CASH", 2), 0.2, "trade[CASH,2]");
    assert_close(plan.weight("CASH", 3), 1.0, "weight[CASH,3]");
}

#[test]
fn test_zero_trade_size_cannot_liquidate() {
    let spec = spec(json!({
        "initial_weights": {"GOOG": 0.3, "CASH": 0.7},
        "estimated_returns": {"GOOG": {"1": 0.01, "2": 0.02}},
        "parameters": {"max_trade_size": 0.0}
    }));
    let plan = optimizer().run(&spec).unwrap();

    assert_eq!(plan.status, 1);
    assert!(plan.output.weights.is_empty());
    assert!(plan.output.trades.is_empty());
}

#[test]
fn test_cash_floor_above_initial_cash_is_infeasible() {
    let spec = forced_liquidation()
        .with_overrides(&ParameterOverrides {
            min_cash_balance: Some(0.9),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(optimizer().run(&spec).unwrap().status, 1);
}

#[test]
fn test_trade_aversion_never_increases_turnover() {
    // With the hard cost on, the balance rows pin each period's turnover to the
    // previous period's gains, so every aversion yields the same plan here. The
    // penalty's weight is therefore also checked on the built objective.
    let base = offsetting_pair();
    let optimizer = optimizer();
    let mut previous = f64::INFINITY;
    for aversion in [0.0, 0.5, 1.0, 10.0] {
        let spec = base
            .with_overrides(&ParameterOverrides {
                trade_aversion: Some(aversion),
                ..Default::default()
            })
            .unwrap();

        let lp = optimizer.build_model(&spec).unwrap();
        let penalties: Vec<f64> = lp
            .objective()
            .expr
            .terms()
            .iter()
            .filter(|(id, _)| lp.variable(*id).name.starts_with("abs_trade["))
            .map(|(_, coef)| *coef)
            .collect();
        let expected_terms = if aversion == 0.0 { 0 } else { 6 };
        assert_eq!(penalties.len(), expected_terms);
        assert!(penalties.iter().all(|c| (c + aversion * 0.2).abs() < 1e-12));

        let plan = optimizer.run(&spec).unwrap();
        assert!(plan.is_optimal());
        let turnover = non_cash_turnover(&spec, &plan);
        assert!(turnover <= previous + TOL);
        assert!((turnover - 0.5625).abs() < TOL);
        previous = turnover;
    }
}

#[test]
fn test_receding_horizon_consistency() {
    let full = offsetting_pair();
    let plan = optimizer().run(&full).unwrap();
    assert_plan_invariants(&full, &plan);

    assert_close(plan.weight("GOOG", 2), 0.25, "weight[GOOG,2]");
    assert_close(plan.weight("APPL", 2), 0.2, "weight[APPL,2]");
    assert_close(plan.weight("CASH", 2), 0.55, "weight[CASH,2]");

    // Start again from the period-2 state with the remaining forecasts.
    let rolled = spec(json!({
        "initial_weights": {"GOOG": 0.25, "APPL": 0.2, "CASH": 0.55},
        "estimated_returns": {
            "GOOG": {"1": 0.25, "2": 0.0},
            "APPL": {"1": 0.25, "2": 0.0}
        },
        "parameters": {"transaction_cost": 0.2}
    }));
    let replan = optimizer().run(&rolled).unwrap();
    assert_plan_invariants(&rolled, &replan);

    for asset in ["GOOG", "APPL", "CASH"] {
        for t in 1..=3 {
            assert_close(
                replan.weight(asset, t),
                plan.weight(asset, t + 1).unwrap(),
                &format!("rolled weight[{},{}]", asset, t),
            );
        }
        for t in 1..=2 {
            assert_close(
                replan.trade(asset, t),
                plan.trade(asset, t + 1).unwrap(),
                &format!("rolled trade[{},{}]", asset, t),
            );
        }
    }
    assert_close(plan.trade("GOOG", 3), -0.3125, "trade[GOOG,3]");
    assert_close(plan.trade("APPL", 3), -0.25, "trade[APPL,3]");
}

#[test]
fn test_hard_cost_toggle_changes_feasibility() {
    let spec = spec(json!({
        "initial_weights": {"GOOG": 0.3, "CASH": 0.7},
        "estimated_returns": {"GOOG": {"1": 0.0, "2": 0.0}}
    }));

    // With the cost leaking out of the balance, nothing can be sold without a gain
    // to pay for it.
    assert_eq!(optimizer().run(&spec).unwrap().status, 1);

    let balanced = optimizer().with_model_options(ModelOptions {
        hard_transaction_cost: false,
        soft_trade_penalty: true,
    });
    let plan = balanced.run(&spec).unwrap();
    assert!(plan.is_optimal());
    assert_close(plan.weight("GOOG", 3), 0.0, "weight[GOOG,3]");
    assert_close(plan.weight("CASH", 3), 1.0, "weight[CASH,3]");
    assert!((non_cash_turnover(&spec, &plan) - 0.3).abs() < 1e-4);
}

#[test]
fn test_batch_keeps_input_order() {
    let infeasible = forced_liquidation()
        .with_overrides(&ParameterOverrides {
            max_trade_size: Some(0.0),
            ..Default::default()
        })
        .unwrap();
    let specs = vec![worked_example(), infeasible, forced_liquidation()];

    let statuses: Vec<u8> = optimizer()
        .run_batch(&specs)
        .into_iter()
        .map(|result| result.unwrap().status)
        .collect();
    assert_eq!(statuses, vec![0, 1, 0]);
}

#[test]
fn test_response_serializes_to_wire_shape() {
    let plan = optimizer().run(&forced_liquidation()).unwrap();
    let body = serde_json::to_value(&plan).unwrap();

    assert_eq!(body["status"], 0);
    let weights = body["output"]["weights"]["GOOG"].as_object().unwrap();
    let labels: Vec<&str> = weights.keys().map(String::as_str).collect();
    assert_eq!(labels, vec!["1", "2", "3"]);
    assert_eq!(body["output"]["trades"]["CASH"].as_object().unwrap().len(), 2);
}
