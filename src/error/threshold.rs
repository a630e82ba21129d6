use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ThresholdError {
    #[error("Threshold expression must not be empty.")]
    Empty,
    #[error("Threshold '{expression}' has no comparison operator.")]
    MissingOperator { expression: String },
    #[error("Unknown aggregation '{aggregation}' in '{expression}'.")]
    UnknownAggregation {
        expression: String,
        aggregation: String,
    },
    #[error("Invalid percentile '{value}' in '{expression}'. Use p(N) with 0 <= N <= 100.")]
    InvalidPercentile { expression: String, value: String },
    #[error("Invalid bound '{value}' in '{expression}'.")]
    InvalidBound { expression: String, value: String },
    #[error("Invalid metric selector '{selector}'.")]
    InvalidSelector { selector: String },
    #[error("Aggregation '{aggregation}' is not valid for {kind} metric '{metric}'.")]
    IncompatibleAggregation {
        metric: String,
        kind: &'static str,
        aggregation: String,
    },
}
