use thiserror::Error;

use crate::metrics::MetricKind;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Metric name must not be empty.")]
    EmptyName,
    #[error("Metric name '{name}' contains invalid character '{ch}'.")]
    InvalidName { name: String, ch: char },
    #[error("Metric name '{name}' is longer than {max} characters.")]
    NameTooLong { name: String, max: usize },
    #[error("Metric '{name}' is a {existing}, not a {requested}.")]
    KindMismatch {
        name: String,
        existing: MetricKind,
        requested: MetricKind,
    },
}
