use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tag set attached to a sample.
pub type Tags = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Monotonic sum.
    Counter,
    /// Most recent value.
    Gauge,
    /// Fraction of non-zero observations.
    Rate,
    /// Distribution of observed values.
    Trend,
}

impl MetricKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Rate => "rate",
            MetricKind::Trend => "trend",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a metric's values measure; only affects formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    #[default]
    Default,
    /// Milliseconds.
    Time,
    /// Bytes.
    Data,
}

/// A single observation. Never mutated once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub metric: String,
    pub kind: MetricKind,
    pub value: f64,
    pub time: DateTime<Utc>,
    pub tags: Tags,
}

impl Sample {
    #[must_use]
    pub fn new(kind: MetricKind, metric: &str, value: f64, tags: Tags) -> Self {
        Self {
            metric: metric.to_owned(),
            kind,
            value,
            time: Utc::now(),
            tags,
        }
    }

    /// Rate sample for a boolean observation.
    #[must_use]
    pub fn rate(metric: &str, passed: bool, tags: Tags) -> Self {
        Self::new(MetricKind::Rate, metric, bool_value(passed), tags)
    }
}

pub(crate) const fn bool_value(value: bool) -> f64 {
    if value { 1.0 } else { 0.0 }
}
