//! Entry points for the `fuzz/` targets.
use std::path::Path;
use std::time::Duration;

use crate::config::types::ConfigFile;
use crate::config::{build_plan, parse_config, parse_duration_value, parse_header};
use crate::engine::TestPlan;
use crate::error::{AppError, AppResult, ConfigError};
use crate::scheduler::{Stage, target_at};
use crate::script::StepScript;
use crate::thresholds::{Threshold, ThresholdExpr};

/// Parses a duration value from config (e.g. `10s`, `1m30s`).
///
/// # Errors
///
/// Returns an error when the duration is invalid.
pub fn parse_duration_value_input(input: &str) -> AppResult<Duration> {
    parse_duration_value(input).map_err(|message| {
        AppError::config(ConfigError::InvalidDuration {
            field: "fuzz".to_owned(),
            message,
        })
    })
}

/// Parses a header string in `Key: Value` format.
///
/// # Errors
///
/// Returns an error when the header is malformed.
pub fn parse_header_input(input: &str) -> AppResult<(String, String)> {
    parse_header(input).map_err(AppError::from)
}

/// Parses a threshold expression such as `p(95)<500`.
///
/// # Errors
///
/// Returns an error when the expression is malformed.
pub fn parse_threshold_expr_input(input: &str) -> AppResult<ThresholdExpr> {
    input.parse::<ThresholdExpr>().map_err(AppError::from)
}

/// Parses a metric selector and expression into a threshold.
///
/// # Errors
///
/// Returns an error when either part is malformed.
pub fn parse_threshold_input(selector: &str, expression: &str) -> AppResult<Threshold> {
    Threshold::parse(selector, expression).map_err(AppError::from)
}

/// Parses a TOML config and converts it into a plan and step script.
///
/// # Errors
///
/// Returns an error when parsing or validation fails.
pub fn build_plan_from_toml(input: &str) -> AppResult<TestPlan> {
    let config = parse_config(Path::new("fuzz.toml"), input)?;
    plan_with_steps(&config)
}

/// Parses a JSON config and converts it into a plan and step script.
///
/// # Errors
///
/// Returns an error when parsing or validation fails.
pub fn build_plan_from_json(input: &str) -> AppResult<TestPlan> {
    let config = parse_config(Path::new("fuzz.json"), input)?;
    plan_with_steps(&config)
}

fn plan_with_steps(config: &ConfigFile) -> AppResult<TestPlan> {
    let plan = build_plan(config, None)?;
    if let Some(steps) = config.steps.as_deref() {
        StepScript::from_config(steps)?;
    }
    Ok(plan)
}

/// Target VU count of a staged ramp at `elapsed_ms`.
#[must_use]
pub fn target_at_input(start: u64, stages: &[(u64, u64)], elapsed_ms: u64) -> u64 {
    let stages: Vec<Stage> = stages
        .iter()
        .map(|(duration_ms, target)| Stage::new(Duration::from_millis(*duration_ms), *target))
        .collect();
    target_at(start, &stages, Duration::from_millis(elapsed_ms))
}
