use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::metrics::{MetricKind, MetricSnapshot, RecordedMetric, ValueType, names};
use crate::scheduler::ScenarioReport;
use crate::thresholds::ThresholdResult;

use super::TrendStat;

/// Lifecycle phase of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Setup,
    Running,
    Teardown,
    Summarized,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Init => "init",
            Phase::Setup => "setup",
            Phase::Running => "running",
            Phase::Teardown => "teardown",
            Phase::Summarized => "summarized",
        })
    }
}

/// How the run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TestOutcome {
    Completed,
    ThresholdsFailed,
    AbortedByThreshold,
    /// Stopped by Ctrl+C or SIGTERM.
    Interrupted,
    SetupFailed,
}

impl TestOutcome {
    /// Process exit code for this outcome.
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            TestOutcome::Completed => 0,
            TestOutcome::ThresholdsFailed | TestOutcome::AbortedByThreshold => 99,
            TestOutcome::Interrupted => 105,
            TestOutcome::SetupFailed => 107,
        }
    }

    /// Whether load was generated at all.
    #[must_use]
    pub const fn executed(self) -> bool {
        !matches!(self, TestOutcome::SetupFailed)
    }
}

impl fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TestOutcome::Completed => "completed",
            TestOutcome::ThresholdsFailed => "thresholds failed",
            TestOutcome::AbortedByThreshold => "aborted by threshold",
            TestOutcome::Interrupted => "interrupted",
            TestOutcome::SetupFailed => "setup failed",
        })
    }
}

/// Summary values of one metric or submetric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSummary {
    #[serde(rename = "type")]
    pub kind: MetricKind,
    pub contains: ValueType,
    pub values: BTreeMap<String, f64>,
    /// Threshold expression -> passed.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub thresholds: BTreeMap<String, bool>,
    /// Display order of `values`.
    #[serde(skip)]
    pub order: Vec<String>,
}

impl MetricSummary {
    fn from_recorded(recorded: &RecordedMetric, stats: &[TrendStat], elapsed: Duration) -> Self {
        let values: Vec<(String, f64)> = match &recorded.snapshot {
            MetricSnapshot::Counter(counter) => vec![
                ("count".to_owned(), counter.count),
                ("rate".to_owned(), counter.per_second(elapsed.as_secs_f64())),
            ],
            MetricSnapshot::Gauge(gauge) => vec![
                ("value".to_owned(), gauge.value),
                ("min".to_owned(), gauge.min),
                ("max".to_owned(), gauge.max),
            ],
            MetricSnapshot::Rate(rate) => vec![
                ("rate".to_owned(), rate.rate()),
                ("passes".to_owned(), rate.passes as f64),
                ("fails".to_owned(), rate.fails() as f64),
            ],
            MetricSnapshot::Trend(trend) => stats
                .iter()
                .map(|stat| (stat.to_string(), stat.read(trend)))
                .collect(),
        };
        Self {
            kind: recorded.kind,
            contains: recorded.value_type,
            order: values.iter().map(|(name, _)| name.clone()).collect(),
            values: values.into_iter().collect(),
            thresholds: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn value(&self, stat: &str) -> Option<f64> {
        self.values.get(stat).copied()
    }
}

/// Summaries of every recorded series, with threshold verdicts attached.
#[must_use]
pub fn summarize_metrics(
    recorded: &[RecordedMetric],
    stats: &[TrendStat],
    elapsed: Duration,
    thresholds: &[ThresholdResult],
) -> BTreeMap<String, MetricSummary> {
    let mut metrics: BTreeMap<String, MetricSummary> = recorded
        .iter()
        .map(|metric| {
            (
                metric.name.clone(),
                MetricSummary::from_recorded(metric, stats, elapsed),
            )
        })
        .collect();
    for result in thresholds {
        if let Some(summary) = metrics.get_mut(&result.metric) {
            summary
                .thresholds
                .insert(result.expression.clone(), result.passed);
        }
    }
    metrics
}

fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64() * 1000.0)
}

/// Final, immutable report of a run.
#[derive(Debug, Clone, Serialize)]
pub struct TestResult {
    pub passed: bool,
    pub outcome: TestOutcome,
    pub started_at: DateTime<Utc>,
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
    pub thresholds: Vec<ThresholdResult>,
    pub metrics: BTreeMap<String, MetricSummary>,
    pub scenarios: Vec<ScenarioReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted_by: Option<ThresholdResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setup_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teardown_error: Option<String>,
}

impl TestResult {
    pub(crate) fn setup_failed(started_at: DateTime<Utc>, duration: Duration, error: String) -> Self {
        Self {
            passed: false,
            outcome: TestOutcome::SetupFailed,
            started_at,
            duration,
            thresholds: Vec::new(),
            metrics: BTreeMap::new(),
            scenarios: Vec::new(),
            aborted_by: None,
            setup_error: Some(error),
            teardown_error: None,
        }
    }

    /// Completed iterations across all scenarios.
    #[must_use]
    pub fn iterations(&self) -> u64 {
        self.scenarios
            .iter()
            .map(|scenario| scenario.completed)
            .fold(0, u64::saturating_add)
    }

    #[must_use]
    pub fn metric(&self, name: &str) -> Option<&MetricSummary> {
        self.metrics.get(name)
    }

    /// Requests issued, from the `http_reqs` counter.
    #[must_use]
    pub fn http_reqs(&self) -> f64 {
        self.metric(names::HTTP_REQS)
            .and_then(|summary| summary.value("count"))
            .unwrap_or(0.0)
    }

    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        self.outcome.exit_code()
    }
}
