use crate::error::ValidationError;
use serde::{Deserialize, Serialize};

/// The risk, cost and trading limits of one optimization.
///
/// All values are fractions of total portfolio value except `trade_aversion`,
/// which is a unitless multiplier on the soft trading penalty.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    /// Lower bound on every non-cash weight. Negative values permit shorting.
    pub min_weight: f64,
    /// Upper bound on every non-cash weight.
    pub max_weight: f64,
    /// Floor on the cash weight in every period.
    pub min_cash_balance: f64,
    /// Cap on the sum of absolute non-cash weights.
    pub max_leverage: f64,
    /// Cap on the absolute trade in any one asset and period.
    pub max_trade_size: f64,
    /// Scales the objective penalty on traded volume.
    pub trade_aversion: f64,
    /// Proportional cost charged on traded volume, e.g. 0.01 for 1%.
    pub transaction_cost: f64,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            min_weight: -1.0,
            max_weight: 1.0,
            min_cash_balance: 0.0,
            max_leverage: 1.0,
            max_trade_size: 1.0,
            trade_aversion: 1.0,
            transaction_cost: 0.01,
        }
    }
}

impl Parameters {
    /// Applies the caller's overrides on top of `self` and validates the result.
    pub fn merge(&self, overrides: &ParameterOverrides) -> Result<Self, ValidationError> {
        let merged = Self {
            min_weight: overrides.min_weight.unwrap_or(self.min_weight),
            max_weight: overrides.max_weight.unwrap_or(self.max_weight),
            min_cash_balance: overrides.min_cash_balance.unwrap_or(self.min_cash_balance),
            max_leverage: overrides.max_leverage.unwrap_or(self.max_leverage),
            max_trade_size: overrides.max_trade_size.unwrap_or(self.max_trade_size),
            trade_aversion: overrides.trade_aversion.unwrap_or(self.trade_aversion),
            transaction_cost: overrides.transaction_cost.unwrap_or(self.transaction_cost),
        };
        merged.validate()?;
        Ok(merged)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let fields = [
            ("min_weight", self.min_weight),
            ("max_weight", self.max_weight),
            ("min_cash_balance", self.min_cash_balance),
            ("max_leverage", self.max_leverage),
            ("max_trade_size", self.max_trade_size),
            ("trade_aversion", self.trade_aversion),
            ("transaction_cost", self.transaction_cost),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(invalid(name, format!("{} is not a finite number", value)));
            }
        }

        if self.min_weight > self.max_weight {
            return Err(invalid(
                "min_weight",
                format!("{} exceeds max_weight {}", self.min_weight, self.max_weight),
            ));
        }
        for (name, value) in [
            ("transaction_cost", self.transaction_cost),
            ("max_trade_size", self.max_trade_size),
            ("max_leverage", self.max_leverage),
        ] {
            if value < 0.0 {
                return Err(invalid(name, format!("must be non-negative, got {}", value)));
            }
        }
        Ok(())
    }
}

fn invalid(name: &'static str, reason: String) -> ValidationError {
    ValidationError::InvalidParameter { name, reason }
}

/// The optional `parameters` object of a request.
///
/// Absent keys fall back to the defaults; keys that are not parameters at all are
/// ignored rather than rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterOverrides {
    pub min_weight: Option<f64>,
    pub max_weight: Option<f64>,
    pub min_cash_balance: Option<f64>,
    pub max_leverage: Option<f64>,
    pub max_trade_size: Option<f64>,
    pub trade_aversion: Option<f64>,
    pub transaction_cost: Option<f64>,
}
