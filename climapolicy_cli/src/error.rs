use climapolicy::error::ClimateError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Generic(String),
    #[error("Wrapped anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
    #[error("Serde JSON error: {0}")]
    SerdeJSONError(#[from] serde_json::Error),
    #[error("Polars error: {0}")]
    PolarsError(#[from] polars::error::PolarsError),
    #[error("{0}")]
    ClimateError(#[from] ClimateError),
    #[error("Failed to parse config: {0}")]
    TomlError(#[from] toml::de::Error),
    #[error("IO error: {0}")]
    IOError(#[from] std::io::Error),
}

pub type CliResult<T> = Result<T, CliError>;
