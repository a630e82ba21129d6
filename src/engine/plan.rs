use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::error::ConfigError;
use crate::http::ClientOptions;
use crate::metrics::{TrendSnapshot, builtin_kind};
use crate::scheduler::LoadProfile;
use crate::thresholds::{ABORT_EVAL_INTERVAL, Threshold};

/// Default limit for setup and teardown callbacks.
pub const DEFAULT_LIFECYCLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Aggregate shown for Trend metrics in the summary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrendStat {
    Avg,
    Min,
    Med,
    Max,
    Count,
    Percentile(f64),
}

impl TrendStat {
    #[must_use]
    pub fn defaults() -> Vec<TrendStat> {
        vec![
            TrendStat::Avg,
            TrendStat::Min,
            TrendStat::Med,
            TrendStat::Max,
            TrendStat::Percentile(90.0),
            TrendStat::Percentile(95.0),
        ]
    }

    #[must_use]
    pub fn read(self, trend: &TrendSnapshot) -> f64 {
        match self {
            TrendStat::Avg => trend.avg(),
            TrendStat::Min => trend.min(),
            TrendStat::Med => trend.med(),
            TrendStat::Max => trend.max(),
            TrendStat::Count => trend.count() as f64,
            TrendStat::Percentile(p) => trend.percentile(p),
        }
    }
}

impl fmt::Display for TrendStat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendStat::Avg => f.write_str("avg"),
            TrendStat::Min => f.write_str("min"),
            TrendStat::Med => f.write_str("med"),
            TrendStat::Max => f.write_str("max"),
            TrendStat::Count => f.write_str("count"),
            TrendStat::Percentile(p) => write!(f, "p({})", p),
        }
    }
}

impl Serialize for TrendStat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl FromStr for TrendStat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        let invalid = || ConfigError::InvalidTrendStat {
            value: value.to_owned(),
        };
        match value {
            "avg" => Ok(TrendStat::Avg),
            "min" => Ok(TrendStat::Min),
            "med" => Ok(TrendStat::Med),
            "max" => Ok(TrendStat::Max),
            "count" => Ok(TrendStat::Count),
            _ => {
                let inner = value
                    .strip_prefix("p(")
                    .and_then(|rest| rest.strip_suffix(')'))
                    .ok_or_else(invalid)?;
                let p: f64 = inner.trim().parse().map_err(|_err| invalid())?;
                if !(0.0..=100.0).contains(&p) {
                    return Err(invalid());
                }
                Ok(TrendStat::Percentile(p))
            }
        }
    }
}

/// Everything a run needs, fixed at Init.
#[derive(Debug, Clone)]
pub struct TestPlan {
    pub profile: LoadProfile,
    pub thresholds: Vec<Threshold>,
    pub http: ClientOptions,
    pub setup_timeout: Duration,
    pub teardown_timeout: Duration,
    pub summary_trend_stats: Vec<TrendStat>,
    /// Period of the mid-test abort threshold check.
    pub abort_eval_interval: Duration,
}

impl TestPlan {
    #[must_use]
    pub fn new(profile: LoadProfile) -> Self {
        Self {
            profile,
            thresholds: Vec::new(),
            http: ClientOptions::default(),
            setup_timeout: DEFAULT_LIFECYCLE_TIMEOUT,
            teardown_timeout: DEFAULT_LIFECYCLE_TIMEOUT,
            summary_trend_stats: TrendStat::defaults(),
            abort_eval_interval: ABORT_EVAL_INTERVAL,
        }
    }

    #[must_use]
    pub fn threshold(mut self, threshold: Threshold) -> Self {
        self.thresholds.push(threshold);
        self
    }

    #[must_use]
    pub fn http(mut self, http: ClientOptions) -> Self {
        self.http = http;
        self
    }

    /// # Errors
    ///
    /// Returns the first configuration problem: an invalid profile, a base URL
    /// that does not parse, or a threshold whose aggregation cannot apply to a
    /// built-in metric.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.profile.validate()?;
        if let Some(base_url) = self.http.base_url.as_deref() {
            url::Url::parse(base_url).map_err(|err| ConfigError::InvalidBaseUrl {
                url: base_url.to_owned(),
                source: err,
            })?;
        }
        for threshold in &self.thresholds {
            if let Some(kind) = builtin_kind(&threshold.selector.name) {
                threshold
                    .check_kind(kind)
                    .map_err(|err| ConfigError::InvalidThreshold {
                        metric: threshold.selector.to_string(),
                        source: err,
                    })?;
            }
        }
        Ok(())
    }
}
