use std::time::Duration;

use serde::Serialize;

use crate::metrics::{MetricSink, MetricSnapshot};

use super::Threshold;

/// Outcome of one threshold against the sink's current state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdResult {
    pub metric: String,
    pub expression: String,
    pub passed: bool,
    /// Aggregate the expression was checked against.
    pub observed: Option<f64>,
    pub abort_on_fail: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Evaluates one threshold. `elapsed` is the run time used for counter rates.
#[must_use]
pub fn evaluate_one(sink: &MetricSink, threshold: &Threshold, elapsed: Duration) -> ThresholdResult {
    let snapshot = sink.snapshot_selector(&threshold.selector);
    evaluate_snapshot(threshold, snapshot.as_ref(), elapsed)
}

/// Evaluates one threshold against an already taken snapshot of its metric.
#[must_use]
pub fn evaluate_snapshot(
    threshold: &Threshold,
    snapshot: Option<&MetricSnapshot>,
    elapsed: Duration,
) -> ThresholdResult {
    let mut result = ThresholdResult {
        metric: threshold.selector.to_string(),
        expression: threshold.source.clone(),
        passed: false,
        observed: None,
        abort_on_fail: threshold.abort_on_fail,
        reason: None,
    };

    let Some(snapshot) = snapshot else {
        result.reason = Some("metric was never recorded".to_owned());
        return result;
    };
    if let Err(err) = threshold.check_kind(snapshot.kind()) {
        result.reason = Some(err.to_string());
        return result;
    }
    let Some(observed) = threshold.expr.aggregation.observe(snapshot, elapsed) else {
        result.reason = Some(format!(
            "{} is not available for {}",
            threshold.expr.aggregation,
            snapshot.kind()
        ));
        return result;
    };

    result.observed = Some(observed);
    result.passed = threshold.expr.holds(observed);
    result
}

/// Evaluates every threshold, in declaration order.
#[must_use]
pub fn evaluate(sink: &MetricSink, thresholds: &[Threshold], elapsed: Duration) -> Vec<ThresholdResult> {
    thresholds
        .iter()
        .map(|threshold| evaluate_one(sink, threshold, elapsed))
        .collect()
}

#[must_use]
pub fn all_passed(results: &[ThresholdResult]) -> bool {
    results.iter().all(|result| result.passed)
}
