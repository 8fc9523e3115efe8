use thiserror::Error;

/// Everything that can be wrong with an optimization request.
///
/// Validation stops at the first problem found; `field()` names the offending
/// part of the request so the transport layer can point the caller at it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("initial_weights must contain the cash account 'CASH'")]
    MissingCash,

    #[error("'{0}' is ambiguous with the reserved cash identifier 'CASH'")]
    AmbiguousCash(String),

    #[error("initial weight for '{asset}' is not a finite number")]
    NonFiniteWeight { asset: String },

    #[error("initial_weights sum to {sum}, expected 1 (tolerance {tolerance})")]
    WeightsDoNotSumToOne { sum: f64, tolerance: f64 },

    #[error("no return forecast supplied for '{0}'")]
    MissingForecast(String),

    #[error("return forecast supplied for '{0}', which has no initial weight")]
    UnknownForecastAsset(String),

    #[error("the forecast horizon must contain at least one period")]
    EmptyHorizon,

    #[error("forecast for '{asset}' has {found} periods, expected {expected}")]
    HorizonMismatch {
        asset: String,
        expected: usize,
        found: usize,
    },

    #[error("forecast for '{asset}' has an invalid period label '{label}'")]
    InvalidPeriodLabel { asset: String, label: String },

    #[error("forecast for '{asset}' is missing period {period}")]
    MissingPeriod { asset: String, period: usize },

    #[error("forecast for '{asset}' in period {period} is not a finite number")]
    NonFiniteReturn { asset: String, period: String },

    #[error("cash earns a fixed zero return; forecast for '{asset}' must be zero")]
    NonZeroCashReturn { asset: String },

    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

impl ValidationError {
    /// The request field the error refers to, e.g. `estimated_returns.GOOG`.
    pub fn field(&self) -> String {
        match self {
            ValidationError::MissingCash | ValidationError::WeightsDoNotSumToOne { .. } => {
                "initial_weights".to_string()
            }
            ValidationError::AmbiguousCash(asset)
            | ValidationError::NonFiniteWeight { asset } => format!("initial_weights.{}", asset),
            ValidationError::MissingForecast(asset)
            | ValidationError::UnknownForecastAsset(asset)
            | ValidationError::HorizonMismatch { asset, .. }
            | ValidationError::InvalidPeriodLabel { asset, .. }
            | ValidationError::MissingPeriod { asset, .. }
            | ValidationError::NonFiniteReturn { asset, .. }
            | ValidationError::NonZeroCashReturn { asset } => {
                format!("estimated_returns.{}", asset)
            }
            ValidationError::EmptyHorizon => "estimated_returns".to_string(),
            ValidationError::InvalidParameter { name, .. } => format!("parameters.{}", name),
        }
    }
}
