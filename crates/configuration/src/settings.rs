use crate::error::ConfigError;
use core_types::{DEFAULT_WEIGHT_SUM_TOLERANCE, Parameters};
use serde::Deserialize;
use std::path::PathBuf;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: Server,
    pub solver: SolverSettings,
    pub model: ModelSettings,
    pub logging: Logging,
}

impl Config {
    /// Rejects settings that would make every solve fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.solver.max_iter == 0 {
            return Err(ConfigError::ValidationError(
                "solver.max_iter must be greater than 0".to_string(),
            ));
        }
        if !(self.solver.time_limit_secs > 0.0) {
            return Err(ConfigError::ValidationError(
                "solver.time_limit_secs must be greater than 0".to_string(),
            ));
        }
        if !(self.model.weight_sum_tolerance >= 0.0) {
            return Err(ConfigError::ValidationError(
                "model.weight_sum_tolerance must be non-negative".to_string(),
            ));
        }
        if self.model.output_precision > 15 {
            return Err(ConfigError::ValidationError(
                "model.output_precision cannot exceed 15 decimal places".to_string(),
            ));
        }
        self.model.defaults.validate()?;
        Ok(())
    }
}

/// Where the HTTP surface listens.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Server {
    pub host: String,
    pub port: u16,
    /// Upper bound on request bodies.
    pub body_limit_bytes: usize,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            body_limit_bytes: 1024 * 1024 * 5,
        }
    }
}

/// Settings handed to the LP solver backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    pub max_iter: u32,
    /// Wall-clock budget of one solve. Running out is reported as a non-optimal
    /// status, not as an error.
    pub time_limit_secs: f64,
    /// Count a solution found only to the solver's reduced tolerances as optimal.
    pub accept_reduced_accuracy: bool,
    /// Retry the solve call once if the backend itself fails.
    pub retry_on_failure: bool,
    /// Let the backend print its iteration log.
    pub verbose: bool,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            max_iter: 200,
            time_limit_secs: 10.0,
            accept_reduced_accuracy: false,
            retry_on_failure: true,
            verbose: false,
        }
    }
}

/// How requests are turned into linear programs and how plans are reported.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Deduct transaction costs inside the self-financing constraint.
    pub hard_transaction_cost: bool,
    /// Penalise traded volume in the objective, scaled by `trade_aversion`.
    pub soft_trade_penalty: bool,
    /// Decimal places kept in reported weights and trades.
    pub output_precision: u32,
    /// Allowed distance between the initial weight sum and 1.
    pub weight_sum_tolerance: f64,
    /// Parameter values used when a request does not override them.
    pub defaults: Parameters,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            hard_transaction_cost: true,
            soft_trade_penalty: true,
            output_precision: 9,
            weight_sum_tolerance: DEFAULT_WEIGHT_SUM_TOLERANCE,
            defaults: Parameters::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Logging {
    /// Used when `RUST_LOG` is not set.
    pub level: LogLevel,
    /// When set, logs are also written to a daily rolling file in this directory.
    pub directory: Option<PathBuf>,
    pub file_prefix: String,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            directory: None,
            file_prefix: "horizon.log".to_string(),
        }
    }
}
