use thiserror::Error;

use super::{ConfigError, MetricsError, RequestError, ScriptError, ThresholdError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("CLI error: {source}")]
    Clap {
        #[from]
        source: clap::Error,
    },
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("HTTP error: {0}")]
    Request(#[from] RequestError),
    #[error("Metrics error: {0}")]
    Metrics(#[from] MetricsError),
    #[error("Threshold error: {0}")]
    Threshold(#[from] ThresholdError),
    #[error("Script error: {0}")]
    Script(#[from] ScriptError),
    #[error("Failed to write summary '{path}': {source}")]
    WriteSummary {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn config<E>(error: E) -> Self
    where
        E: Into<ConfigError>,
    {
        error.into().into()
    }

    pub fn metrics<E>(error: E) -> Self
    where
        E: Into<MetricsError>,
    {
        error.into().into()
    }

    pub fn script<E>(error: E) -> Self
    where
        E: Into<ScriptError>,
    {
        error.into().into()
    }
}
