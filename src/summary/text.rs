use std::time::Duration;

use crate::engine::{MetricSummary, TestResult};
use crate::metrics::ValueType;

const PASS_MARK: &str = "✓";
const FAIL_MARK: &str = "✗";
/// Dots between a metric name and its values.
const MIN_LEADER: usize = 3;

/// Renders `result` as the end-of-test text summary.
#[must_use]
pub fn summary_lines(result: &TestResult) -> Vec<String> {
    let mut lines = Vec::new();
    let verdict = if result.passed { "passed" } else { "failed" };
    lines.push(format!("Outcome: {} ({})", result.outcome, verdict));
    lines.push(format!("Duration: {}", format_duration(result.duration)));

    if let Some(error) = result.setup_error.as_ref() {
        lines.push(format!("Setup failed: {}", error));
        lines.push("No load was generated.".to_owned());
        return lines;
    }

    if let Some(aborted_by) = result.aborted_by.as_ref() {
        lines.push(format!(
            "Aborted by threshold: {} {}",
            aborted_by.metric, aborted_by.expression
        ));
    }

    if !result.scenarios.is_empty() {
        lines.push(String::new());
        lines.push("Scenarios:".to_owned());
        for scenario in &result.scenarios {
            lines.push(format!(
                "  {} ({}): {} completed, {} failed, {} interrupted",
                scenario.name,
                scenario.executor,
                scenario.completed,
                scenario.failed,
                scenario.interrupted
            ));
        }
    }

    if !result.thresholds.is_empty() {
        lines.push(String::new());
        lines.push("Thresholds:".to_owned());
        for threshold in &result.thresholds {
            let mark = if threshold.passed { PASS_MARK } else { FAIL_MARK };
            let observed = threshold
                .observed
                .map_or_else(|| "n/a".to_owned(), format_number);
            let mut line = format!(
                "  {} {}: {} (observed {})",
                mark, threshold.metric, threshold.expression, observed
            );
            if let Some(reason) = threshold.reason.as_ref() {
                line.push_str(" - ");
                line.push_str(reason);
            }
            lines.push(line);
        }
    }

    if !result.metrics.is_empty() {
        lines.push(String::new());
        lines.push("Metrics:".to_owned());
        let width = result
            .metrics
            .keys()
            .map(|name| name.chars().count())
            .max()
            .unwrap_or(0)
            .saturating_add(MIN_LEADER);
        for (name, summary) in &result.metrics {
            lines.push(metric_line(name, summary, width));
        }
    }

    if let Some(error) = result.teardown_error.as_ref() {
        lines.push(String::new());
        lines.push(format!("Teardown failed: {}", error));
    }
    lines
}

/// Prints the text summary to stdout.
pub fn print_summary(result: &TestResult) {
    for line in summary_lines(result) {
        println!("{}", line);
    }
}

fn metric_line(name: &str, summary: &MetricSummary, width: usize) -> String {
    let mark = if summary.thresholds.is_empty() {
        " "
    } else if summary.thresholds.values().all(|passed| *passed) {
        PASS_MARK
    } else {
        FAIL_MARK
    };
    let dots = ".".repeat(width.saturating_sub(name.chars().count()));
    let values: Vec<String> = summary
        .order
        .iter()
        .filter_map(|stat| {
            summary
                .value(stat)
                .map(|value| format!("{}={}", stat, format_value(stat, value, summary.contains)))
        })
        .collect();
    format!("  {} {}{}: {}", mark, name, dots, values.join(" "))
}

fn format_value(stat: &str, value: f64, contains: ValueType) -> String {
    let counted = matches!(stat, "count" | "passes" | "fails");
    match contains {
        ValueType::Time if !counted => format!("{}ms", format_number(value)),
        ValueType::Data if !counted => format!("{}B", format_number(value)),
        ValueType::Time | ValueType::Data | ValueType::Default => format_number(value),
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.0}", value)
    } else if value.abs() < 1.0 {
        format!("{:.4}", value)
    } else {
        format!("{:.2}", value)
    }
}

fn format_duration(duration: Duration) -> String {
    format!("{:.2}s", duration.as_secs_f64())
}
