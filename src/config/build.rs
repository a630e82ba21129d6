use std::collections::BTreeMap;
use std::time::Duration;

use crate::engine::{TestPlan, TrendStat};
use crate::error::ConfigError;
use crate::http::ClientOptions;
use crate::scheduler::{
    DEFAULT_SCENARIO, Executor, LoadProfile, ScenarioSpec, Stage, validate_scenario_name,
};
use crate::thresholds::Threshold;

use super::parse::{non_negative, parse_header};
use super::types::{
    ConfigFile, DurationValue, ExecutorKind, ScenarioConfig, StageConfig, ThresholdConfig,
};

/// Upper bound for iteration-based executors without an explicit limit.
pub const DEFAULT_MAX_DURATION: Duration = Duration::from_secs(600);

/// Converts a config file into a validated plan.
///
/// `base_url` overrides the file's `base_url` (CLI flag or `BASE_URL`).
///
/// # Errors
///
/// Returns the first invalid or conflicting setting.
pub fn build_plan(config: &ConfigFile, base_url: Option<&str>) -> Result<TestPlan, ConfigError> {
    let mut plan = TestPlan::new(build_profile(config)?);
    plan.http = build_client_options(config, base_url)?;
    plan.thresholds = build_thresholds(config)?;
    if let Some(stats) = config.summary_trend_stats.as_ref() {
        plan.summary_trend_stats = stats
            .iter()
            .map(|stat| stat.parse::<TrendStat>())
            .collect::<Result<_, _>>()?;
    }
    if let Some(timeout) = config.setup_timeout.as_ref() {
        plan.setup_timeout = timeout.to_duration("setup_timeout")?;
    }
    if let Some(timeout) = config.teardown_timeout.as_ref() {
        plan.teardown_timeout = timeout.to_duration("teardown_timeout")?;
    }
    plan.validate()?;
    Ok(plan)
}

fn build_client_options(
    config: &ConfigFile,
    base_url: Option<&str>,
) -> Result<ClientOptions, ConfigError> {
    let mut options = ClientOptions {
        base_url: base_url
            .map(str::to_owned)
            .or_else(|| config.base_url.clone())
            .filter(|url| !url.trim().is_empty()),
        ..ClientOptions::default()
    };
    if let Some(timeout) = config.timeout.as_ref() {
        options.timeout = positive(timeout, "timeout")?;
    }
    if let Some(timeout) = config.connect_timeout.as_ref() {
        options.connect_timeout = positive(timeout, "connect_timeout")?;
    }
    if let Some(insecure) = config.insecure_skip_tls_verify {
        options.insecure_skip_tls_verify = insecure;
    }
    if let Some(agent) = config.user_agent.as_ref() {
        options.user_agent = if agent.is_empty() {
            None
        } else {
            Some(agent.clone())
        };
    }
    if let Some(headers) = config.headers.as_ref() {
        options.headers = headers
            .iter()
            .map(|header| parse_header(header))
            .collect::<Result<_, _>>()?;
    }
    Ok(options)
}

fn positive(value: &DurationValue, field: &str) -> Result<Duration, ConfigError> {
    let duration = value.to_duration(field)?;
    if duration.is_zero() {
        return Err(ConfigError::InvalidDuration {
            field: field.to_owned(),
            message: "Duration must be > 0.".to_owned(),
        });
    }
    Ok(duration)
}

fn build_thresholds(config: &ConfigFile) -> Result<Vec<Threshold>, ConfigError> {
    let Some(thresholds) = config.thresholds.as_ref() else {
        return Ok(Vec::new());
    };
    let mut parsed = Vec::new();
    for (metric, list) in thresholds {
        for entry in list.entries() {
            let invalid = |source| ConfigError::InvalidThreshold {
                metric: metric.clone(),
                source,
            };
            let threshold = match entry {
                ThresholdConfig::Expression(expression) => {
                    Threshold::parse(metric, expression).map_err(invalid)?
                }
                ThresholdConfig::Detailed {
                    threshold,
                    abort_on_fail,
                    delay_abort_eval,
                } => {
                    let mut detailed = Threshold::parse(metric, threshold).map_err(invalid)?;
                    if *abort_on_fail {
                        let delay = match delay_abort_eval {
                            Some(delay) => delay.to_duration("delay_abort_eval")?,
                            None => Duration::ZERO,
                        };
                        detailed = detailed.abort_on_fail(delay);
                    }
                    detailed
                }
            };
            parsed.push(threshold);
        }
    }
    Ok(parsed)
}

fn build_profile(config: &ConfigFile) -> Result<LoadProfile, ConfigError> {
    let shorthand = [
        ("vus", config.vus.is_some()),
        ("duration", config.duration.is_some()),
        ("iterations", config.iterations.is_some()),
    ];
    if let Some(scenarios) = config.scenarios.as_ref() {
        if config.stages.is_some() {
            return Err(ConfigError::Conflict {
                left: "scenarios",
                right: "stages",
            });
        }
        if let Some((field, _)) = shorthand.iter().find(|(_, set)| *set) {
            return Err(ConfigError::Conflict {
                left: "scenarios",
                right: *field,
            });
        }
        let mut built = BTreeMap::new();
        for (name, scenario) in &scenarios.0 {
            validate_scenario_name(name)?;
            if built.contains_key(name) {
                return Err(ConfigError::DuplicateScenario { name: name.clone() });
            }
            let mut spec = build_scenario(name, scenario)?;
            if let Some(tags) = config.tags.as_ref() {
                for (key, value) in tags {
                    spec.tags.entry(key.clone()).or_insert_with(|| value.clone());
                }
            }
            built.insert(name.clone(), spec);
        }
        if built.is_empty() {
            return Err(ConfigError::MissingLoadProfile);
        }
        return Ok(LoadProfile::Scenarios(built));
    }

    if let Some(stages) = config.stages.as_ref() {
        if let Some((field, _)) = shorthand.iter().find(|(_, set)| *set) {
            return Err(ConfigError::Conflict {
                left: "stages",
                right: *field,
            });
        }
        let stages = build_stages(DEFAULT_SCENARIO, stages)?;
        if config.tags.is_none() {
            return Ok(LoadProfile::Stages(stages));
        }
        let mut spec = ScenarioSpec::new(Executor::RampingVus {
            start_vus: 0,
            stages,
        });
        spec.tags = config.tags.clone().unwrap_or_default();
        return Ok(LoadProfile::Scenarios(
            [(DEFAULT_SCENARIO.to_owned(), spec)].into_iter().collect(),
        ));
    }

    let executor = build_shorthand_executor(config)?;
    let mut spec = ScenarioSpec::new(executor);
    spec.tags = config.tags.clone().unwrap_or_default();
    Ok(LoadProfile::Scenarios(
        [(DEFAULT_SCENARIO.to_owned(), spec)].into_iter().collect(),
    ))
}

/// `vus`/`duration`/`iterations` at the top level.
fn build_shorthand_executor(config: &ConfigFile) -> Result<Executor, ConfigError> {
    let vus = match config.vus {
        Some(vus) => non_negative(DEFAULT_SCENARIO, "vus", vus)?,
        None => 1,
    };
    let duration = config
        .duration
        .as_ref()
        .map(|duration| duration.to_duration("duration"))
        .transpose()?;
    let iterations = config
        .iterations
        .map(|iterations| non_negative(DEFAULT_SCENARIO, "iterations", iterations))
        .transpose()?;

    match (iterations, duration) {
        (Some(iterations), max_duration) => Ok(Executor::SharedIterations {
            vus,
            iterations,
            max_duration: max_duration.unwrap_or(DEFAULT_MAX_DURATION),
        }),
        (None, Some(duration)) => Ok(Executor::ConstantVus { vus, duration }),
        (None, None) if config.vus.is_some() => Err(ConfigError::MissingField {
            field: "vus",
            requires: "duration or iterations",
        }),
        (None, None) => Err(ConfigError::MissingLoadProfile),
    }
}

fn build_stages(context: &str, stages: &[StageConfig]) -> Result<Vec<Stage>, ConfigError> {
    stages
        .iter()
        .enumerate()
        .map(|(index, stage)| {
            let target = u64::try_from(stage.target).map_err(|_err| ConfigError::NegativeTarget {
                context: context.to_owned(),
                index,
                target: stage.target,
            })?;
            let duration = stage
                .duration
                .to_duration(&format!("{}.stages[{}].duration", context, index))?;
            Ok(Stage::new(duration, target))
        })
        .collect()
}

fn build_scenario(name: &str, scenario: &ScenarioConfig) -> Result<ScenarioSpec, ConfigError> {
    let executor_name = scenario.executor.as_str();
    let required = |field: &'static str| ConfigError::ExecutorMissingField {
        name: name.to_owned(),
        executor: executor_name,
        field,
    };
    let count = |field: &'static str, value: Option<i64>| -> Result<Option<u64>, ConfigError> {
        value.map(|value| non_negative(name, field, value)).transpose()
    };
    let duration = |field: &str, value: Option<&DurationValue>| {
        value
            .map(|value| value.to_duration(&format!("{}.{}", name, field)))
            .transpose()
    };

    let executor = match scenario.executor {
        ExecutorKind::RampingVus => Executor::RampingVus {
            start_vus: count("start_vus", scenario.start_vus)?.unwrap_or(0),
            stages: build_stages(
                name,
                scenario.stages.as_deref().ok_or_else(|| required("stages"))?,
            )?,
        },
        ExecutorKind::ConstantVus => Executor::ConstantVus {
            vus: count("vus", scenario.vus)?.unwrap_or(1),
            duration: duration("duration", scenario.duration.as_ref())?
                .ok_or_else(|| required("duration"))?,
        },
        ExecutorKind::PerVuIterations => Executor::PerVuIterations {
            vus: count("vus", scenario.vus)?.unwrap_or(1),
            iterations: count("iterations", scenario.iterations)?.unwrap_or(1),
            max_duration: duration("max_duration", scenario.max_duration.as_ref())?
                .unwrap_or(DEFAULT_MAX_DURATION),
        },
        ExecutorKind::SharedIterations => Executor::SharedIterations {
            vus: count("vus", scenario.vus)?.unwrap_or(1),
            iterations: count("iterations", scenario.iterations)?.unwrap_or(1),
            max_duration: duration("max_duration", scenario.max_duration.as_ref())?
                .unwrap_or(DEFAULT_MAX_DURATION),
        },
    };

    let mut spec = ScenarioSpec::new(executor);
    if let Some(start_time) = duration("start_time", scenario.start_time.as_ref())? {
        spec = spec.start_time(start_time);
    }
    if let Some(graceful_stop) = duration("graceful_stop", scenario.graceful_stop.as_ref())? {
        spec = spec.graceful_stop(graceful_stop);
    }
    if let Some(pause) = duration("pause", scenario.pause.as_ref())? {
        spec = spec.pause(pause);
    }
    spec.tags = scenario.tags.clone().unwrap_or_default();
    Ok(spec)
}
