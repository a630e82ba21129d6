use serde::Serialize;

use super::MetricKind;

/// Mutable accumulation state of one series. Lives behind the series mutex.
#[derive(Debug, Clone)]
pub(crate) enum SeriesState {
    Counter { sum: f64, count: u64 },
    Gauge { value: f64, min: f64, max: f64, count: u64 },
    Rate { trues: u64, total: u64 },
    Trend { values: Vec<f64>, sum: f64, min: f64, max: f64 },
}

impl SeriesState {
    pub(crate) const fn new(kind: MetricKind) -> Self {
        match kind {
            MetricKind::Counter => SeriesState::Counter { sum: 0.0, count: 0 },
            MetricKind::Gauge => SeriesState::Gauge {
                value: 0.0,
                min: 0.0,
                max: 0.0,
                count: 0,
            },
            MetricKind::Rate => SeriesState::Rate { trues: 0, total: 0 },
            MetricKind::Trend => SeriesState::Trend {
                values: Vec::new(),
                sum: 0.0,
                min: 0.0,
                max: 0.0,
            },
        }
    }

    /// O(1) amortized; trends only append.
    pub(crate) fn add(&mut self, sample: f64) {
        match self {
            SeriesState::Counter { sum, count } => {
                *sum += sample;
                *count = count.saturating_add(1);
            }
            SeriesState::Gauge {
                value,
                min,
                max,
                count,
            } => {
                if *count == 0 {
                    *min = sample;
                    *max = sample;
                } else {
                    *min = min.min(sample);
                    *max = max.max(sample);
                }
                *value = sample;
                *count = count.saturating_add(1);
            }
            SeriesState::Rate { trues, total } => {
                if sample != 0.0 {
                    *trues = trues.saturating_add(1);
                }
                *total = total.saturating_add(1);
            }
            SeriesState::Trend {
                values,
                sum,
                min,
                max,
            } => {
                if values.is_empty() {
                    *min = sample;
                    *max = sample;
                } else {
                    *min = min.min(sample);
                    *max = max.max(sample);
                }
                *sum += sample;
                values.push(sample);
            }
        }
    }

    pub(crate) fn observations(&self) -> u64 {
        match self {
            SeriesState::Counter { count, .. } | SeriesState::Gauge { count, .. } => *count,
            SeriesState::Rate { total, .. } => *total,
            SeriesState::Trend { values, .. } => values.len() as u64,
        }
    }

    /// Turns a copy of the state into an aggregate, or `None` before the
    /// first observation. Trend values are sorted here, never on insert, and
    /// callers clone the state out of the series lock first so the sort never
    /// holds up writers.
    pub(crate) fn into_snapshot(self) -> Option<MetricSnapshot> {
        if self.observations() == 0 {
            return None;
        }
        Some(match self {
            SeriesState::Counter { sum, count } => MetricSnapshot::Counter(CounterSnapshot {
                count: sum,
                samples: count,
            }),
            SeriesState::Gauge {
                value, min, max, ..
            } => MetricSnapshot::Gauge(GaugeSnapshot { value, min, max }),
            SeriesState::Rate { trues, total } => MetricSnapshot::Rate(RateSnapshot {
                passes: trues,
                total,
            }),
            SeriesState::Trend {
                mut values,
                sum,
                min,
                max,
            } => {
                values.sort_unstable_by(f64::total_cmp);
                MetricSnapshot::Trend(TrendSnapshot {
                    sorted: values,
                    sum,
                    min,
                    max,
                })
            }
        })
    }
}

/// Point-in-time aggregate of one series.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricSnapshot {
    Counter(CounterSnapshot),
    Gauge(GaugeSnapshot),
    Rate(RateSnapshot),
    Trend(TrendSnapshot),
}

impl MetricSnapshot {
    #[must_use]
    pub const fn kind(&self) -> MetricKind {
        match self {
            MetricSnapshot::Counter(_) => MetricKind::Counter,
            MetricSnapshot::Gauge(_) => MetricKind::Gauge,
            MetricSnapshot::Rate(_) => MetricKind::Rate,
            MetricSnapshot::Trend(_) => MetricKind::Trend,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CounterSnapshot {
    /// Sum of all added values.
    pub count: f64,
    /// Number of `add` calls.
    pub samples: u64,
}

impl CounterSnapshot {
    /// Per-second rate over `elapsed_secs`.
    #[must_use]
    pub fn per_second(&self, elapsed_secs: f64) -> f64 {
        if elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.count / elapsed_secs
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GaugeSnapshot {
    pub value: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateSnapshot {
    pub passes: u64,
    pub total: u64,
}

impl RateSnapshot {
    #[must_use]
    pub const fn fails(&self) -> u64 {
        self.total.saturating_sub(self.passes)
    }

    /// Fraction of true observations; 0 when nothing was recorded.
    #[must_use]
    pub fn rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.passes as f64 / self.total as f64
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrendSnapshot {
    sorted: Vec<f64>,
    sum: f64,
    min: f64,
    max: f64,
}

impl TrendSnapshot {
    #[cfg(test)]
    pub(crate) fn from_values(values: &[f64]) -> Self {
        let mut state = SeriesState::new(MetricKind::Trend);
        for value in values {
            state.add(*value);
        }
        match state.into_snapshot() {
            Some(MetricSnapshot::Trend(snapshot)) => snapshot,
            Some(
                MetricSnapshot::Counter(_) | MetricSnapshot::Gauge(_) | MetricSnapshot::Rate(_),
            )
            | None => Self {
                sorted: Vec::new(),
                sum: 0.0,
                min: 0.0,
                max: 0.0,
            },
        }
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.sorted.len()
    }

    #[must_use]
    pub const fn min(&self) -> f64 {
        self.min
    }

    #[must_use]
    pub const fn max(&self) -> f64 {
        self.max
    }

    #[must_use]
    pub fn avg(&self) -> f64 {
        if self.sorted.is_empty() {
            return 0.0;
        }
        self.sum / self.sorted.len() as f64
    }

    /// Midpoint of the sorted values; the mean of the two middle values when
    /// the count is even.
    #[must_use]
    pub fn med(&self) -> f64 {
        let count = self.sorted.len();
        let upper = count / 2;
        let Some(high) = self.sorted.get(upper).copied() else {
            return 0.0;
        };
        if count % 2 == 1 {
            return high;
        }
        let low = upper
            .checked_sub(1)
            .and_then(|idx| self.sorted.get(idx).copied())
            .unwrap_or(high);
        (low + high) / 2.0
    }

    /// Percentile `p` (0..=100): the sample at rank `ceil(p/100 * n) - 1`
    /// of the sorted values.
    #[must_use]
    pub fn percentile(&self, p: f64) -> f64 {
        let count = self.sorted.len();
        if count == 0 {
            return 0.0;
        }
        let rank = (p.clamp(0.0, 100.0) / 100.0 * count as f64).ceil() as usize;
        let idx = rank.saturating_sub(1).min(count.saturating_sub(1));
        self.sorted.get(idx).copied().unwrap_or(self.max)
    }
}
