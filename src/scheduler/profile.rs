use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::ConfigError;
use crate::metrics::Tags;

/// Scenario name used for top-level `stages` / `vus` shorthands.
pub const DEFAULT_SCENARIO: &str = "default";
/// Time in-flight iterations get to finish once a scenario ends.
pub const DEFAULT_GRACEFUL_STOP: Duration = Duration::from_secs(30);
/// Longest accepted scenario name.
pub const MAX_SCENARIO_NAME_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stage {
    pub duration: Duration,
    pub target: u64,
}

impl Stage {
    #[must_use]
    pub const fn new(duration: Duration, target: u64) -> Self {
        Self { duration, target }
    }
}

/// How a scenario schedules its executions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Executor {
    RampingVus {
        start_vus: u64,
        stages: Vec<Stage>,
    },
    ConstantVus {
        vus: u64,
        duration: Duration,
    },
    PerVuIterations {
        vus: u64,
        iterations: u64,
        max_duration: Duration,
    },
    SharedIterations {
        vus: u64,
        iterations: u64,
        max_duration: Duration,
    },
}

impl Executor {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Executor::RampingVus { .. } => "ramping-vus",
            Executor::ConstantVus { .. } => "constant-vus",
            Executor::PerVuIterations { .. } => "per-vu-iterations",
            Executor::SharedIterations { .. } => "shared-iterations",
        }
    }

    /// Scheduled run time, excluding graceful stop.
    #[must_use]
    pub fn duration(&self) -> Duration {
        match self {
            Executor::RampingVus { stages, .. } => stages
                .iter()
                .fold(Duration::ZERO, |total, stage| total.saturating_add(stage.duration)),
            Executor::ConstantVus { duration, .. } => *duration,
            Executor::PerVuIterations { max_duration, .. }
            | Executor::SharedIterations { max_duration, .. } => *max_duration,
        }
    }

    /// Highest concurrency the executor can ask for.
    #[must_use]
    pub fn max_vus(&self) -> u64 {
        match self {
            Executor::RampingVus { start_vus, stages } => stages
                .iter()
                .map(|stage| stage.target)
                .fold(*start_vus, u64::max),
            Executor::ConstantVus { vus, .. }
            | Executor::PerVuIterations { vus, .. }
            | Executor::SharedIterations { vus, .. } => *vus,
        }
    }

    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        let executor = self.name();
        let missing = |field| ConfigError::ExecutorMissingField {
            name: name.to_owned(),
            executor,
            field,
        };
        match self {
            Executor::RampingVus { stages, .. } => {
                if stages.is_empty() {
                    return Err(ConfigError::EmptyStages {
                        name: name.to_owned(),
                    });
                }
            }
            Executor::ConstantVus { vus, duration } => {
                if *vus == 0 {
                    return Err(missing("vus"));
                }
                if duration.is_zero() {
                    return Err(missing("duration"));
                }
            }
            Executor::PerVuIterations {
                vus, iterations, ..
            }
            | Executor::SharedIterations {
                vus, iterations, ..
            } => {
                if *vus == 0 {
                    return Err(missing("vus"));
                }
                if *iterations == 0 {
                    return Err(missing("iterations"));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioSpec {
    pub executor: Executor,
    /// Offset from the start of the run.
    pub start_time: Duration,
    pub graceful_stop: Duration,
    /// Sleep between iterations of one execution.
    pub pause: Option<Duration>,
    /// Extra tags on every sample of this scenario.
    pub tags: Tags,
}

impl ScenarioSpec {
    #[must_use]
    pub const fn new(executor: Executor) -> Self {
        Self {
            executor,
            start_time: Duration::ZERO,
            graceful_stop: DEFAULT_GRACEFUL_STOP,
            pause: None,
            tags: Tags::new(),
        }
    }

    #[must_use]
    pub const fn start_time(mut self, start_time: Duration) -> Self {
        self.start_time = start_time;
        self
    }

    #[must_use]
    pub const fn graceful_stop(mut self, graceful_stop: Duration) -> Self {
        self.graceful_stop = graceful_stop;
        self
    }

    #[must_use]
    pub const fn pause(mut self, pause: Duration) -> Self {
        self.pause = Some(pause);
        self
    }

    /// When the scenario stops starting iterations, relative to run start.
    #[must_use]
    pub fn end_offset(&self) -> Duration {
        self.start_time.saturating_add(self.executor.duration())
    }
}

/// Declarative load shape of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadProfile {
    /// Shorthand for one `ramping-vus` scenario starting at zero.
    Stages(Vec<Stage>),
    Scenarios(BTreeMap<String, ScenarioSpec>),
}

impl LoadProfile {
    /// Named scenarios, with the stage shorthand expanded.
    #[must_use]
    pub fn scenarios(&self) -> Vec<(String, ScenarioSpec)> {
        match self {
            LoadProfile::Stages(stages) => vec![(
                DEFAULT_SCENARIO.to_owned(),
                ScenarioSpec::new(Executor::RampingVus {
                    start_vus: 0,
                    stages: stages.clone(),
                }),
            )],
            LoadProfile::Scenarios(scenarios) => scenarios
                .iter()
                .map(|(name, spec)| (name.clone(), spec.clone()))
                .collect(),
        }
    }

    /// Latest scheduled scenario end, excluding graceful stop.
    #[must_use]
    pub fn max_duration(&self) -> Duration {
        self.scenarios()
            .iter()
            .map(|(_, spec)| spec.end_offset())
            .max()
            .unwrap_or_default()
    }

    /// Upper bound on concurrent executions across all scenarios.
    #[must_use]
    pub fn max_vus(&self) -> u64 {
        self.scenarios()
            .iter()
            .map(|(_, spec)| spec.executor.max_vus())
            .fold(0, u64::saturating_add)
    }

    /// # Errors
    ///
    /// Returns an error for empty profiles, invalid scenario names, or
    /// executors missing a required setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            LoadProfile::Stages(stages) => {
                if stages.is_empty() {
                    return Err(ConfigError::EmptyStages {
                        name: DEFAULT_SCENARIO.to_owned(),
                    });
                }
            }
            LoadProfile::Scenarios(scenarios) => {
                if scenarios.is_empty() {
                    return Err(ConfigError::MissingLoadProfile);
                }
                for (name, spec) in scenarios {
                    validate_scenario_name(name)?;
                    spec.executor.validate(name)?;
                }
            }
        }
        Ok(())
    }
}

/// # Errors
///
/// Returns an error when the name is empty, too long, or has characters
/// other than alphanumerics, `_`, `-`, and `.`.
pub fn validate_scenario_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::ScenarioNameEmpty);
    }
    if name.chars().count() > MAX_SCENARIO_NAME_LEN {
        return Err(ConfigError::ScenarioNameTooLong {
            name: name.to_owned(),
            max: MAX_SCENARIO_NAME_LEN,
        });
    }
    if let Some(ch) = name
        .chars()
        .find(|ch| !(ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.')))
    {
        return Err(ConfigError::ScenarioNameInvalidChar {
            name: name.to_owned(),
            ch,
        });
    }
    Ok(())
}

/// Target concurrency `elapsed` into a staged schedule.
///
/// Each stage ramps linearly from the previous stage's target (or `start`)
/// to its own, rounded to the nearest whole VU on millisecond offsets, so a
/// stage's end target is reached before its boundary. Past the last stage the
/// final target holds.
#[must_use]
pub fn target_at(start: u64, stages: &[Stage], elapsed: Duration) -> u64 {
    let mut from = start;
    let mut offset_ms = elapsed.as_millis();
    for stage in stages {
        let stage_ms = stage.duration.as_millis();
        if offset_ms < stage_ms {
            let from_i128 = i128::from(from);
            let delta = i128::from(stage.target).saturating_sub(from_i128);
            let span = i128::try_from(stage_ms).unwrap_or(i128::MAX);
            // floor(delta * offset / span + 1/2)
            let step = delta
                .saturating_mul(i128::try_from(offset_ms).unwrap_or(i128::MAX))
                .saturating_mul(2)
                .saturating_add(span)
                .checked_div_euclid(span.saturating_mul(2))
                .unwrap_or(0);
            let target = from_i128.saturating_add(step);
            return if target < 0 {
                0
            } else {
                u64::try_from(target).unwrap_or(u64::MAX)
            };
        }
        offset_ms = offset_ms.saturating_sub(stage_ms);
        from = stage.target;
    }
    from
}
