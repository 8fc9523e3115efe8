use crate::asset::{AssetId, AssetSet, CASH};
use crate::error::ValidationError;
use crate::parameters::{ParameterOverrides, Parameters};
use crate::period::Period;
use crate::request::OptimizationRequest;
use std::collections::BTreeMap;

/// Allowed distance between the sum of the initial weights and 1.
pub const DEFAULT_WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// An immutable, validated optimization problem.
///
/// Invariants guaranteed by construction:
/// - the asset set contains exactly one cash account;
/// - every asset has an initial weight and the weights sum to 1;
/// - every asset has exactly `horizon` forecast returns (zero for cash);
/// - the parameters satisfy their bound invariants.
#[derive(Debug, Clone, PartialEq)]
pub struct ProblemSpec {
    assets: AssetSet,
    horizon: usize,
    initial_weights: Vec<f64>,
    /// `returns[asset][period.offset()]`
    returns: Vec<Vec<f64>>,
    parameters: Parameters,
}

impl ProblemSpec {
    /// Validates a request against the built-in defaults and tolerance.
    pub fn from_request(request: &OptimizationRequest) -> Result<Self, ValidationError> {
        Self::from_request_with(request, &Parameters::default(), DEFAULT_WEIGHT_SUM_TOLERANCE)
    }

    /// Validates a request, filling absent parameters from `defaults`.
    ///
    /// Checks run in a fixed order (cash, weight sum, forecasts, parameters) and
    /// the first failure is returned.
    pub fn from_request_with(
        request: &OptimizationRequest,
        defaults: &Parameters,
        tolerance: f64,
    ) -> Result<Self, ValidationError> {
        // --- 1. Cash account ---
        for asset in request.initial_weights.keys() {
            if asset != CASH && asset.eq_ignore_ascii_case(CASH) {
                return Err(ValidationError::AmbiguousCash(asset.clone()));
            }
        }
        let assets = AssetSet::new(request.initial_weights.keys().map(AssetId::from).collect())
            .ok_or(ValidationError::MissingCash)?;

        // --- 2. Initial weights ---
        // The request map iterates in the same lexicographic order as the asset set.
        let mut initial_weights = Vec::with_capacity(assets.len());
        for (asset, &weight) in &request.initial_weights {
            if !weight.is_finite() {
                return Err(ValidationError::NonFiniteWeight { asset: asset.clone() });
            }
            initial_weights.push(weight);
        }
        let sum: f64 = initial_weights.iter().sum();
        if (sum - 1.0).abs() > tolerance {
            return Err(ValidationError::WeightsDoNotSumToOne { sum, tolerance });
        }

        // --- 3. Forecasts ---
        for (_, asset) in assets.non_cash() {
            if !request.estimated_returns.contains_key(asset.as_str()) {
                return Err(ValidationError::MissingForecast(asset.to_string()));
            }
        }
        for asset in request.estimated_returns.keys() {
            if !request.initial_weights.contains_key(asset) {
                return Err(ValidationError::UnknownForecastAsset(asset.clone()));
            }
        }

        // The first non-cash series fixes the horizon; a cash-only universe takes it
        // from the (optional) cash series.
        let horizon = assets
            .non_cash()
            .chain(assets.iter().filter(|(_, a)| a.is_cash()))
            .find_map(|(_, asset)| request.estimated_returns.get(asset.as_str()))
            .map(BTreeMap::len)
            .unwrap_or(0);
        if horizon == 0 {
            return Err(ValidationError::EmptyHorizon);
        }

        let mut returns = Vec::with_capacity(assets.len());
        for (_, asset) in assets.iter() {
            let series = match request.estimated_returns.get(asset.as_str()) {
                Some(raw) => parse_series(asset, raw, horizon)?,
                None => vec![0.0; horizon],
            };
            if asset.is_cash() && series.iter().any(|r| *r != 0.0) {
                return Err(ValidationError::NonZeroCashReturn { asset: asset.to_string() });
            }
            returns.push(series);
        }

        // --- 4. Parameters ---
        let overrides = request.parameters.clone().unwrap_or_default();
        let parameters = defaults.merge(&overrides)?;

        tracing::debug!(
            assets = assets.len(),
            horizon,
            "Validated optimization request."
        );

        Ok(Self {
            assets,
            horizon,
            initial_weights,
            returns,
            parameters,
        })
    }

    pub fn assets(&self) -> &AssetSet {
        &self.assets
    }

    /// Number of forecast (trade) periods, `T`.
    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// Weight periods `1..=T+1`.
    pub fn weight_periods(&self) -> impl Iterator<Item = Period> + Clone + use<> {
        Period::range(self.horizon + 1)
    }

    /// Trade periods `1..=T`.
    pub fn trade_periods(&self) -> impl Iterator<Item = Period> + Clone + use<> {
        Period::range(self.horizon)
    }

    /// The last weight period, `T+1`.
    pub fn terminal_period(&self) -> Period {
        Period::range(self.horizon + 1).last().unwrap_or(Period::FIRST)
    }

    pub fn initial_weight(&self, asset: usize) -> Option<f64> {
        self.initial_weights.get(asset).copied()
    }

    /// Forecast return of `asset` over trade period `period`; zero for cash.
    pub fn expected_return(&self, asset: usize, period: Period) -> Option<f64> {
        self.returns.get(asset)?.get(period.offset()).copied()
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// The same problem under different limits.
    pub fn with_overrides(&self, overrides: &ParameterOverrides) -> Result<Self, ValidationError> {
        let parameters = self.parameters.merge(overrides)?;
        Ok(Self {
            parameters,
            ..self.clone()
        })
    }
}

fn parse_series(
    asset: &AssetId,
    raw: &BTreeMap<String, f64>,
    horizon: usize,
) -> Result<Vec<f64>, ValidationError> {
    if raw.len() != horizon {
        return Err(ValidationError::HorizonMismatch {
            asset: asset.to_string(),
            expected: horizon,
            found: raw.len(),
        });
    }

    let mut by_period = BTreeMap::new();
    for (label, value) in raw {
        let period: Period = label.parse().map_err(|_| ValidationError::InvalidPeriodLabel {
            asset: asset.to_string(),
            label: label.clone(),
        })?;
        if !value.is_finite() {
            return Err(ValidationError::NonFiniteReturn {
                asset: asset.to_string(),
                period: label.clone(),
            });
        }
        by_period.insert(period, *value);
    }

    Period::range(horizon)
        .map(|period| {
            by_period
                .get(&period)
                .copied()
                .ok_or_else(|| ValidationError::MissingPeriod {
                    asset: asset.to_string(),
                    period: period.get() as usize,
                })
        })
        .collect()
}
