use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::error::MetricsError;

use super::builtin::BUILTIN_METRICS;
use super::series::{MetricSnapshot, SeriesState};
use super::{MetricKind, MetricSelector, Sample, Tags, ValueType};

/// Longest accepted metric name.
const MAX_METRIC_NAME_LEN: usize = 128;

/// One named series plus the submetrics that observe it.
///
/// Each series has its own lock, so concurrent writers only contend when they
/// hit the same metric.
pub(crate) struct Series {
    name: String,
    kind: MetricKind,
    value_type: ValueType,
    state: Mutex<SeriesState>,
    submetrics: Vec<(MetricSelector, Arc<Series>)>,
}

impl Series {
    fn new(name: String, kind: MetricKind, value_type: ValueType) -> Self {
        Self {
            name,
            kind,
            value_type,
            state: Mutex::new(SeriesState::new(kind)),
            submetrics: Vec::new(),
        }
    }

    fn add(&self, value: f64, tags: &Tags) {
        self.state.lock().add(value);
        for (selector, submetric) in &self.submetrics {
            if selector.matches(tags) {
                submetric.state.lock().add(value);
            }
        }
    }

    fn check_kind(&self, requested: MetricKind) -> Result<(), MetricsError> {
        if self.kind == requested {
            return Ok(());
        }
        Err(MetricsError::KindMismatch {
            name: self.name.clone(),
            existing: self.kind,
            requested,
        })
    }
}

struct SinkInner {
    registry: RwLock<HashMap<String, Arc<Series>>>,
    submetrics: Vec<MetricSelector>,
}

/// Shared, thread-safe store for every metric of a run.
///
/// Cloning is cheap and every clone writes to the same registry.
#[derive(Clone)]
pub struct MetricSink {
    inner: Arc<SinkInner>,
}

/// A recorded series as seen by summaries.
#[derive(Debug, Clone)]
pub struct RecordedMetric {
    pub name: String,
    pub kind: MetricKind,
    pub value_type: ValueType,
    pub submetric: bool,
    pub snapshot: MetricSnapshot,
}

impl Default for MetricSink {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricSink {
    #[must_use]
    pub fn new() -> Self {
        Self::with_submetrics(Vec::new())
    }

    /// Builds a sink that also tracks the given submetrics.
    ///
    /// Submetrics are fixed for the lifetime of the sink; a selector without a
    /// tag filter is ignored.
    #[must_use]
    pub fn with_submetrics<I>(selectors: I) -> Self
    where
        I: IntoIterator<Item = MetricSelector>,
    {
        let mut submetrics: Vec<MetricSelector> = Vec::new();
        for selector in selectors {
            if selector.is_submetric() && !submetrics.contains(&selector) {
                submetrics.push(selector);
            }
        }
        let sink = Self {
            inner: Arc::new(SinkInner {
                registry: RwLock::new(HashMap::new()),
                submetrics,
            }),
        };
        {
            let mut registry = sink.inner.registry.write();
            for (name, kind, value_type) in BUILTIN_METRICS {
                sink.insert_series(&mut registry, name, kind, value_type);
            }
        }
        sink
    }

    /// Counter handle; registers the metric on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid or already used by another kind.
    pub fn counter(&self, name: &str) -> Result<Counter, MetricsError> {
        self.register(name, MetricKind::Counter, ValueType::Default)
            .map(Counter)
    }

    /// Gauge handle; registers the metric on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid or already used by another kind.
    pub fn gauge(&self, name: &str) -> Result<Gauge, MetricsError> {
        self.register(name, MetricKind::Gauge, ValueType::Default)
            .map(Gauge)
    }

    /// Rate handle; registers the metric on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid or already used by another kind.
    pub fn rate(&self, name: &str) -> Result<Rate, MetricsError> {
        self.register(name, MetricKind::Rate, ValueType::Default)
            .map(Rate)
    }

    /// Trend handle; registers the metric on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid or already used by another kind.
    pub fn trend(&self, name: &str) -> Result<Trend, MetricsError> {
        self.trend_with(name, ValueType::Default)
    }

    /// Trend handle whose values are formatted as `value_type`.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid or already used by another kind.
    pub fn trend_with(&self, name: &str, value_type: ValueType) -> Result<Trend, MetricsError> {
        self.register(name, MetricKind::Trend, value_type)
            .map(Trend)
    }

    /// Records one sample.
    ///
    /// # Errors
    ///
    /// Returns an error if the sample's kind conflicts with the registered kind
    /// of its metric, or the metric name is invalid.
    pub fn record(&self, sample: &Sample) -> Result<(), MetricsError> {
        let series = self.register(&sample.metric, sample.kind, ValueType::Default)?;
        series.add(sample.value, &sample.tags);
        Ok(())
    }

    /// Records samples in order, stopping at the first rejected one.
    ///
    /// # Errors
    ///
    /// See [`MetricSink::record`].
    pub fn record_all<'sample, I>(&self, samples: I) -> Result<(), MetricsError>
    where
        I: IntoIterator<Item = &'sample Sample>,
    {
        for sample in samples {
            self.record(sample)?;
        }
        Ok(())
    }

    /// Kind of a registered metric or submetric.
    #[must_use]
    pub fn kind_of(&self, name: &str) -> Option<MetricKind> {
        self.inner.registry.read().get(name).map(|series| series.kind)
    }

    /// Aggregate of a metric, or `None` if nothing was ever recorded for it.
    ///
    /// `name` may be a submetric key such as `http_req_duration{status:200}`.
    #[must_use]
    pub fn snapshot(&self, name: &str) -> Option<MetricSnapshot> {
        let series = self.inner.registry.read().get(name).cloned()?;
        let state = series.state.lock().clone();
        state.into_snapshot()
    }

    #[must_use]
    pub fn snapshot_selector(&self, selector: &MetricSelector) -> Option<MetricSnapshot> {
        self.snapshot(&selector.to_string())
    }

    /// Every series with at least one observation, sorted by name.
    #[must_use]
    pub fn snapshot_all(&self) -> Vec<RecordedMetric> {
        let series: Vec<Arc<Series>> = self.inner.registry.read().values().cloned().collect();
        let mut recorded: Vec<RecordedMetric> = series
            .iter()
            .filter_map(|series| {
                let state = series.state.lock().clone();
                Some(RecordedMetric {
                    name: series.name.clone(),
                    kind: series.kind,
                    value_type: series.value_type,
                    submetric: series.name.contains('{'),
                    snapshot: state.into_snapshot()?,
                })
            })
            .collect();
        recorded.sort_by(|left, right| left.name.cmp(&right.name));
        recorded
    }

    fn register(
        &self,
        name: &str,
        kind: MetricKind,
        value_type: ValueType,
    ) -> Result<Arc<Series>, MetricsError> {
        if let Some(existing) = self.inner.registry.read().get(name) {
            existing.check_kind(kind)?;
            return Ok(Arc::clone(existing));
        }
        validate_metric_name(name)?;

        let mut registry = self.inner.registry.write();
        if let Some(existing) = registry.get(name) {
            existing.check_kind(kind)?;
            return Ok(Arc::clone(existing));
        }
        Ok(self.insert_series(&mut registry, name, kind, value_type))
    }

    fn insert_series(
        &self,
        registry: &mut HashMap<String, Arc<Series>>,
        name: &str,
        kind: MetricKind,
        value_type: ValueType,
    ) -> Arc<Series> {
        let mut series = Series::new(name.to_owned(), kind, value_type);
        for selector in self.inner.submetrics.iter().filter(|sel| sel.name == name) {
            let key = selector.to_string();
            let submetric = Arc::new(Series::new(key.clone(), kind, value_type));
            registry.insert(key, Arc::clone(&submetric));
            series.submetrics.push((selector.clone(), submetric));
        }
        let series = Arc::new(series);
        registry.insert(name.to_owned(), Arc::clone(&series));
        series
    }
}

fn validate_metric_name(name: &str) -> Result<(), MetricsError> {
    if name.is_empty() {
        return Err(MetricsError::EmptyName);
    }
    if let Some(ch) = name
        .chars()
        .find(|ch| !(ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '-')))
    {
        return Err(MetricsError::InvalidName {
            name: name.to_owned(),
            ch,
        });
    }
    if name.len() > MAX_METRIC_NAME_LEN {
        return Err(MetricsError::NameTooLong {
            name: name.to_owned(),
            max: MAX_METRIC_NAME_LEN,
        });
    }
    Ok(())
}

macro_rules! metric_handle {
    ($(#[$doc:meta])* $handle:ident) => {
        $(#[$doc])*
        #[derive(Clone)]
        pub struct $handle(Arc<Series>);

        impl $handle {
            #[must_use]
            pub fn name(&self) -> &str {
                &self.0.name
            }
        }
    };
}

metric_handle!(
    /// Monotonic sum.
    Counter
);
metric_handle!(
    /// Last-value metric.
    Gauge
);
metric_handle!(
    /// Boolean ratio metric.
    Rate
);
metric_handle!(
    /// Distribution metric.
    Trend
);

impl Counter {
    pub fn add(&self, value: f64, tags: &Tags) {
        self.0.add(value, tags);
    }

    pub fn increment(&self, tags: &Tags) {
        self.0.add(1.0, tags);
    }
}

impl Gauge {
    pub fn set(&self, value: f64, tags: &Tags) {
        self.0.add(value, tags);
    }
}

impl Rate {
    pub fn add(&self, passed: bool, tags: &Tags) {
        self.0.add(super::types::bool_value(passed), tags);
    }
}

impl Trend {
    pub fn add(&self, value: f64, tags: &Tags) {
        self.0.add(value, tags);
    }
}
