//! Metric sink: sample accumulation and on-demand aggregation.
mod builtin;
mod selector;
mod series;
mod sink;
mod types;

#[cfg(test)]
mod tests;

pub use builtin::{builtin_kind, names};
pub use selector::MetricSelector;
pub use series::{
    CounterSnapshot, GaugeSnapshot, MetricSnapshot, RateSnapshot, TrendSnapshot,
};
#[cfg(test)]
use series::SeriesState;
pub use sink::{Counter, Gauge, MetricSink, Rate, RecordedMetric, Trend};
pub use types::{MetricKind, Sample, Tags, ValueType};
