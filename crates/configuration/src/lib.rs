use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use logging::init_tracing;
pub use settings::{Config, LogLevel, Logging, ModelSettings, Server, SolverSettings};

/// Prefix of environment variables that override file settings,
/// e.g. `HORIZON__SOLVER__TIME_LIMIT_SECS=2.5`.
const ENV_PREFIX: &str = "HORIZON";

/// Loads the application configuration from `config.toml` in the working directory.
///
/// The file is optional: every setting has a default, so a bare deployment runs
/// with environment overrides alone.
pub fn load_config() -> Result<Config, ConfigError> {
    build(config::File::with_name("config.toml").required(false))
}

/// Loads the application configuration from an explicit path, which must exist.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    build(config::File::from(path).required(true))
}

fn build<S>(file: S) -> Result<Config, ConfigError>
where
    S: config::Source + Send + Sync + 'static,
{
    let builder = config::Config::builder()
        .add_source(file)
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let config = builder.try_deserialize::<Config>()?;
    config.validate()?;
    tracing::debug!(
        port = config.server.port,
        time_limit_secs = config.solver.time_limit_secs,
        hard_transaction_cost = config.model.hard_transaction_cost,
        soft_trade_penalty = config.model.soft_trade_penalty,
        "Configuration loaded."
    );

    Ok(config)
}
