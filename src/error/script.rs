use thiserror::Error;

use super::RequestError;

/// Error returned from a setup, iteration, or teardown callback.
///
/// A `ScriptError` out of setup aborts the test; out of an iteration it is
/// counted in `iterations_failed` and the execution moves on.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error("Unexpected status {actual} from {url} (expected {expected}).")]
    UnexpectedStatus {
        url: String,
        expected: u16,
        actual: u16,
    },
    #[error("JSON pointer '{pointer}' not found in response from {url}.")]
    MissingJsonValue { url: String, pointer: String },
    #[error("JSON value at '{pointer}' is not numeric or a collection.")]
    NotMeasurable { pointer: String },
    #[error("Metric error: {0}")]
    Metrics(#[from] super::MetricsError),
    #[error("{phase} timed out after {timeout_ms}ms.")]
    Timeout {
        phase: &'static str,
        timeout_ms: u128,
    },
}

impl From<&str> for ScriptError {
    fn from(value: &str) -> Self {
        ScriptError::Message(value.to_owned())
    }
}

impl From<String> for ScriptError {
    fn from(value: String) -> Self {
        ScriptError::Message(value)
    }
}
