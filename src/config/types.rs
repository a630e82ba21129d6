use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::de::{Deserializer, MapAccess, Visitor};

/// Top-level config file (TOML or JSON).
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub base_url: Option<String>,
    pub vus: Option<i64>,
    pub duration: Option<DurationValue>,
    pub iterations: Option<i64>,
    pub stages: Option<Vec<StageConfig>>,
    pub scenarios: Option<ScenarioMap>,
    pub thresholds: Option<BTreeMap<String, ThresholdList>>,
    pub summary_trend_stats: Option<Vec<String>>,
    pub timeout: Option<DurationValue>,
    pub connect_timeout: Option<DurationValue>,
    pub setup_timeout: Option<DurationValue>,
    pub teardown_timeout: Option<DurationValue>,
    pub insecure_skip_tls_verify: Option<bool>,
    pub user_agent: Option<String>,
    pub headers: Option<Vec<String>>,
    pub tags: Option<BTreeMap<String, String>>,
    pub steps: Option<Vec<StepConfig>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageConfig {
    pub duration: DurationValue,
    pub target: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutorKind {
    RampingVus,
    ConstantVus,
    PerVuIterations,
    SharedIterations,
}

impl ExecutorKind {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            ExecutorKind::RampingVus => "ramping-vus",
            ExecutorKind::ConstantVus => "constant-vus",
            ExecutorKind::PerVuIterations => "per-vu-iterations",
            ExecutorKind::SharedIterations => "shared-iterations",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    pub executor: ExecutorKind,
    pub start_vus: Option<i64>,
    pub stages: Option<Vec<StageConfig>>,
    pub vus: Option<i64>,
    pub duration: Option<DurationValue>,
    pub iterations: Option<i64>,
    pub max_duration: Option<DurationValue>,
    pub start_time: Option<DurationValue>,
    pub graceful_stop: Option<DurationValue>,
    pub pause: Option<DurationValue>,
    pub tags: Option<BTreeMap<String, String>>,
}

/// Scenario entries in file order, duplicates included so they can be
/// reported by name.
#[derive(Debug, Clone, Default)]
pub struct ScenarioMap(pub Vec<(String, ScenarioConfig)>);

impl<'de> Deserialize<'de> for ScenarioMap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ScenarioMapVisitor;

        impl<'de> Visitor<'de> for ScenarioMapVisitor {
            type Value = ScenarioMap;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a map of scenario name to scenario")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((name, scenario)) = map.next_entry::<String, ScenarioConfig>()? {
                    entries.push((name, scenario));
                }
                Ok(ScenarioMap(entries))
            }
        }

        deserializer.deserialize_map(ScenarioMapVisitor)
    }
}

/// A threshold given as a bare expression or with abort options.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ThresholdConfig {
    Expression(String),
    Detailed {
        threshold: String,
        #[serde(default)]
        abort_on_fail: bool,
        delay_abort_eval: Option<DurationValue>,
    },
}

/// One threshold or a list of them for a metric.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ThresholdList {
    One(ThresholdConfig),
    Many(Vec<ThresholdConfig>),
}

impl ThresholdList {
    pub(crate) fn entries(&self) -> &[ThresholdConfig] {
        match self {
            ThresholdList::One(one) => std::slice::from_ref(one),
            ThresholdList::Many(many) => many,
        }
    }
}

/// One request of the declarative script.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepConfig {
    pub name: Option<String>,
    pub method: Option<String>,
    pub url: Option<String>,
    pub path: Option<String>,
    pub headers: Option<Vec<String>>,
    pub body: Option<String>,
    pub expect_status: Option<u16>,
    pub timeout: Option<DurationValue>,
    pub think_time: Option<DurationValue>,
    /// Upper bound of random extra think time.
    pub think_time_jitter: Option<DurationValue>,
    pub tags: Option<BTreeMap<String, String>>,
    pub metrics: Option<Vec<StepMetricConfig>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepMetricKind {
    Counter,
    Trend,
    Gauge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Measure {
    /// Numeric value at the pointer.
    #[default]
    Value,
    /// Element count of an array, object, or string.
    Length,
}

/// Custom metric fed from the JSON response of a step.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepMetricConfig {
    pub metric: String,
    pub kind: StepMetricKind,
    pub pointer: String,
    #[serde(default)]
    pub measure: Measure,
}

/// Durations as integer seconds or strings like `500ms`, `1m30s`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    Seconds(i64),
    Text(String),
}
