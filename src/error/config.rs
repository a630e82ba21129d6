use std::path::PathBuf;

use thiserror::Error;

use super::ThresholdError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config '{path}': {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse TOML config '{path}': {source}")]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Failed to parse JSON config '{path}': {source}")]
    ParseJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Unsupported config extension '{ext}'. Use .toml or .json.")]
    UnsupportedExtension { ext: String },
    #[error("Config file must have .toml or .json extension.")]
    MissingExtension,
    #[error("No config given and no stampede.toml or stampede.json in the working directory.")]
    NoConfigFile,
    #[error("Config cannot set both '{left}' and '{right}'.")]
    Conflict {
        left: &'static str,
        right: &'static str,
    },
    #[error("Config defines no load: set stages, scenarios, vus/duration, or vus/iterations.")]
    MissingLoadProfile,
    #[error("'{field}' requires '{requires}'.")]
    MissingField {
        field: &'static str,
        requires: &'static str,
    },
    #[error("Stage {index} of '{context}' has negative target {target}.")]
    NegativeTarget {
        context: String,
        index: usize,
        target: i64,
    },
    #[error("'{field}' of '{context}' must not be negative (got {value}).")]
    NegativeValue {
        context: String,
        field: &'static str,
        value: i64,
    },
    #[error("'{field}' of '{context}' must be >= 1.")]
    MustBePositive {
        context: String,
        field: &'static str,
    },
    #[error("Scenario '{name}' is defined more than once.")]
    DuplicateScenario { name: String },
    #[error("Scenario name must not be empty.")]
    ScenarioNameEmpty,
    #[error("Scenario name '{name}' is too long (max {max} characters).")]
    ScenarioNameTooLong { name: String, max: usize },
    #[error("Scenario name '{name}' contains invalid character '{ch}'.")]
    ScenarioNameInvalidChar { name: String, ch: char },
    #[error("Scenario '{name}' uses executor '{executor}' which requires '{field}'.")]
    ExecutorMissingField {
        name: String,
        executor: &'static str,
        field: &'static str,
    },
    #[error("Scenario '{name}' has an empty stage list.")]
    EmptyStages { name: String },
    #[error("Invalid duration for '{field}': {message}")]
    InvalidDuration { field: String, message: String },
    #[error("Invalid threshold for '{metric}': {source}")]
    InvalidThreshold {
        metric: String,
        #[source]
        source: ThresholdError,
    },
    #[error("Invalid base URL '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Invalid header '{value}'. Expected 'Key: Value'.")]
    InvalidHeader { value: String },
    #[error("Step {index} must define url or path.")]
    StepMissingUrl { index: usize },
    #[error("Step {index} has invalid method '{method}'.")]
    InvalidMethod { index: usize, method: String },
    #[error("Config defines no steps to run.")]
    MissingSteps,
    #[error("Invalid summary trend stat '{value}'.")]
    InvalidTrendStat { value: String },
    #[cfg(test)]
    #[error("Test expectation failed: {message}")]
    TestExpectation { message: &'static str },
}

#[cfg(test)]
impl From<&'static str> for ConfigError {
    fn from(message: &'static str) -> Self {
        ConfigError::TestExpectation { message }
    }
}
