use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from file: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation error: {0}")]
    ValidationError(String),

    #[error("Invalid default model parameters: {0}")]
    InvalidDefaults(#[from] core_types::ValidationError),

    #[error("Failed to initialise logging: {0}")]
    Logging(String),
}
