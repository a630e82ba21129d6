use std::path::Path;
use std::time::Duration;

use tempfile::tempdir;

use super::types::{ConfigFile, DurationValue, Measure, StepMetricKind};
use super::{DEFAULT_MAX_DURATION, build_plan, load_config_file, parse_config, parse_duration_value};
use crate::engine::TrendStat;
use crate::error::{AppError, ConfigError};
use crate::scheduler::{DEFAULT_SCENARIO, Executor, LoadProfile, Stage};

const PIZZA_TOML: &str = r#"
base_url = "http://localhost:3333"
stages = [
    { duration = "5s", target = 5 },
    { duration = "10s", target = 5 },
    { duration = "5s", target = 0 },
]
summary_trend_stats = ["avg", "p(99)"]

[thresholds]
http_req_failed = ["rate<0.01"]
http_req_duration = [{ threshold = "p(95)<500", abort_on_fail = true, delay_abort_eval = "10s" }]
"quickpizza_ingredients{scenario:default}" = "avg>1"

[[steps]]
name = "recommend"
method = "post"
path = "/api/pizza"
headers = ["X-User-ID: 23423", "Content-Type: application/json"]
body = '{"maxCaloriesPerSlice": 500}'
expect_status = 200
think_time = "1s"

[[steps.metrics]]
metric = "quickpizza_ingredients"
kind = "trend"
pointer = "/pizza/ingredients"
measure = "length"
"#;

fn parse_toml(content: &str) -> Result<ConfigFile, String> {
    parse_config(Path::new("stampede.toml"), content).map_err(|err| err.to_string())
}

fn parse_json(content: &str) -> Result<ConfigFile, AppError> {
    parse_config(Path::new("stampede.json"), content)
}

fn plan_error(content: &str) -> Result<ConfigError, String> {
    let config = parse_toml(content)?;
    match build_plan(&config, None) {
        Ok(_) => Err("Expected build_plan to fail".to_owned()),
        Err(err) => Ok(err),
    }
}

fn single_executor(profile: &LoadProfile) -> Result<Executor, String> {
    let scenarios = profile.scenarios();
    match scenarios.as_slice() {
        [(name, spec)] if name == DEFAULT_SCENARIO => Ok(spec.executor.clone()),
        other => Err(format!("Expected one default scenario, got {:?}", other)),
    }
}

#[test]
fn pizza_toml_loads_from_file() -> Result<(), String> {
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let path = dir.path().join("pizza.toml");
    std::fs::write(&path, PIZZA_TOML).map_err(|err| format!("write failed: {}", err))?;

    let config = load_config_file(&path).map_err(|err| err.to_string())?;
    let steps = config.steps.as_deref().ok_or("Expected steps")?;
    let step = steps.first().ok_or("Missing step")?;
    if step.expect_status != Some(200) || step.path.as_deref() != Some("/api/pizza") {
        return Err(format!("Unexpected step: {:?}", step));
    }
    let metric = step
        .metrics
        .as_deref()
        .and_then(<[_]>::first)
        .ok_or("Missing step metric")?;
    if metric.kind != StepMetricKind::Trend || metric.measure != Measure::Length {
        return Err(format!("Unexpected step metric: {:?}", metric));
    }
    if step.think_time != Some(DurationValue::Text("1s".to_owned())) {
        return Err("Unexpected think_time".to_owned());
    }
    Ok(())
}

#[test]
fn pizza_toml_builds_plan() -> Result<(), String> {
    let config = parse_toml(PIZZA_TOML)?;
    let plan = build_plan(&config, None).map_err(|err| err.to_string())?;

    let expected = LoadProfile::Stages(vec![
        Stage::new(Duration::from_secs(5), 5),
        Stage::new(Duration::from_secs(10), 5),
        Stage::new(Duration::from_secs(5), 0),
    ]);
    if plan.profile != expected {
        return Err(format!("Unexpected profile: {:?}", plan.profile));
    }
    if plan.http.base_url.as_deref() != Some("http://localhost:3333") {
        return Err("Unexpected base_url".to_owned());
    }
    if plan.summary_trend_stats != vec![TrendStat::Avg, TrendStat::Percentile(99.0)] {
        return Err(format!("Unexpected trend stats: {:?}", plan.summary_trend_stats));
    }
    if plan.thresholds.len() != 3 {
        return Err(format!("Expected 3 thresholds, got {}", plan.thresholds.len()));
    }
    let aborting = plan
        .thresholds
        .iter()
        .find(|threshold| threshold.abort_on_fail)
        .ok_or("Expected an abort threshold")?;
    if aborting.source != "p(95)<500" || aborting.delay_abort_eval != Duration::from_secs(10) {
        return Err(format!("Unexpected abort threshold: {:?}", aborting));
    }
    Ok(())
}

#[test]
fn json_config_builds_named_scenarios() -> Result<(), String> {
    let content = r#"{
        "base_url": "http://localhost:3333",
        "tags": { "team": "pizza" },
        "scenarios": {
            "browse": {
                "executor": "constant-vus",
                "vus": 3,
                "duration": "30s",
                "start_time": "5s",
                "tags": { "flow": "browse" }
            },
            "order": {
                "executor": "shared-iterations",
                "vus": 2,
                "iterations": 50,
                "graceful_stop": 0
            }
        },
        "thresholds": { "checks": "rate>0.99" }
    }"#;
    let config = parse_json(content).map_err(|err| err.to_string())?;
    let plan = build_plan(&config, None).map_err(|err| err.to_string())?;

    let LoadProfile::Scenarios(scenarios) = &plan.profile else {
        return Err("Expected named scenarios".to_owned());
    };
    let browse = scenarios.get("browse").ok_or("Missing browse")?;
    if browse.executor
        != (Executor::ConstantVus {
            vus: 3,
            duration: Duration::from_secs(30),
        })
    {
        return Err(format!("Unexpected browse executor: {:?}", browse.executor));
    }
    if browse.start_time != Duration::from_secs(5) {
        return Err("Unexpected start_time".to_owned());
    }
    if browse.tags.get("flow").map(String::as_str) != Some("browse")
        || browse.tags.get("team").map(String::as_str) != Some("pizza")
    {
        return Err(format!("Unexpected browse tags: {:?}", browse.tags));
    }

    let order = scenarios.get("order").ok_or("Missing order")?;
    if order.executor
        != (Executor::SharedIterations {
            vus: 2,
            iterations: 50,
            max_duration: DEFAULT_MAX_DURATION,
        })
    {
        return Err(format!("Unexpected order executor: {:?}", order.executor));
    }
    if !order.graceful_stop.is_zero() {
        return Err("Expected zero graceful_stop".to_owned());
    }
    Ok(())
}

#[test]
fn negative_stage_target_is_rejected() -> Result<(), String> {
    let err = plan_error(
        r#"
stages = [{ duration = "5s", target = 5 }, { duration = "5s", target = -1 }]
"#,
    )?;
    match err {
        ConfigError::NegativeTarget { index: 1, target: -1, .. } => Ok(()),
        other => Err(format!("Expected NegativeTarget, got {}", other)),
    }
}

#[test]
fn negative_counts_are_rejected() -> Result<(), String> {
    let err = plan_error(
        r#"
[scenarios.smoke]
executor = "per-vu-iterations"
vus = -2
"#,
    )?;
    match err {
        ConfigError::NegativeValue { field: "vus", value: -2, .. } => Ok(()),
        other => Err(format!("Expected NegativeValue, got {}", other)),
    }
}

#[test]
fn duplicate_json_scenario_is_rejected() -> Result<(), String> {
    let content = r#"{
        "scenarios": {
            "smoke": { "executor": "constant-vus", "vus": 1, "duration": "1s" },
            "smoke": { "executor": "constant-vus", "vus": 2, "duration": "1s" }
        }
    }"#;
    let config = parse_json(content).map_err(|err| err.to_string())?;
    match build_plan(&config, None) {
        Err(ConfigError::DuplicateScenario { name }) if name == "smoke" => Ok(()),
        Err(other) => Err(format!("Expected DuplicateScenario, got {}", other)),
        Ok(_) => Err("Expected duplicate scenario error".to_owned()),
    }
}

#[test]
fn duplicate_toml_scenario_fails_to_parse() -> Result<(), String> {
    let content = r#"
[scenarios.smoke]
executor = "constant-vus"
vus = 1
duration = "1s"

[scenarios.smoke]
executor = "constant-vus"
vus = 2
duration = "1s"
"#;
    match parse_config(Path::new("dup.toml"), content) {
        Err(AppError::Config(ConfigError::ParseToml { .. })) => Ok(()),
        Err(other) => Err(format!("Expected ParseToml, got {}", other)),
        Ok(_) => Err("Expected duplicate table to be rejected".to_owned()),
    }
}

#[test]
fn invalid_scenario_name_is_rejected() -> Result<(), String> {
    let err = plan_error(
        r#"
[scenarios."bad name"]
executor = "constant-vus"
vus = 1
duration = "1s"
"#,
    )?;
    match err {
        ConfigError::ScenarioNameInvalidChar { ch: ' ', .. } => Ok(()),
        other => Err(format!("Expected ScenarioNameInvalidChar, got {}", other)),
    }
}

#[test]
fn load_shapes_conflict() -> Result<(), String> {
    let cases = [
        (
            r#"
vus = 2
stages = [{ duration = "1s", target = 1 }]
"#,
            ("stages", "vus"),
        ),
        (
            r#"
duration = "10s"
[scenarios.smoke]
executor = "constant-vus"
vus = 1
duration = "1s"
"#,
            ("scenarios", "duration"),
        ),
        (
            r#"
stages = [{ duration = "1s", target = 1 }]
[scenarios.smoke]
executor = "constant-vus"
vus = 1
duration = "1s"
"#,
            ("scenarios", "stages"),
        ),
    ];
    for (content, (left, right)) in cases {
        match plan_error(content)? {
            ConfigError::Conflict {
                left: got_left,
                right: got_right,
            } if got_left == left && got_right == right => {}
            other => return Err(format!("Expected {}/{} conflict, got {}", left, right, other)),
        }
    }
    Ok(())
}

#[test]
fn shorthand_fields_pick_an_executor() -> Result<(), String> {
    let cases = [
        (
            "vus = 4\nduration = \"30s\"\n",
            Executor::ConstantVus {
                vus: 4,
                duration: Duration::from_secs(30),
            },
        ),
        (
            "vus = 4\niterations = 20\n",
            Executor::SharedIterations {
                vus: 4,
                iterations: 20,
                max_duration: DEFAULT_MAX_DURATION,
            },
        ),
        (
            "vus = 4\niterations = 20\nduration = \"1m\"\n",
            Executor::SharedIterations {
                vus: 4,
                iterations: 20,
                max_duration: Duration::from_secs(60),
            },
        ),
        (
            "duration = 15\n",
            Executor::ConstantVus {
                vus: 1,
                duration: Duration::from_secs(15),
            },
        ),
        (
            "iterations = 3\n",
            Executor::SharedIterations {
                vus: 1,
                iterations: 3,
                max_duration: DEFAULT_MAX_DURATION,
            },
        ),
    ];
    for (content, expected) in cases {
        let config = parse_toml(content)?;
        let plan = build_plan(&config, None).map_err(|err| err.to_string())?;
        let executor = single_executor(&plan.profile)?;
        if executor != expected {
            return Err(format!("{:?}: expected {:?}, got {:?}", content, expected, executor));
        }
    }
    Ok(())
}

#[test]
fn missing_load_is_reported() -> Result<(), String> {
    match plan_error("base_url = \"http://localhost\"\n")? {
        ConfigError::MissingLoadProfile => {}
        other => return Err(format!("Expected MissingLoadProfile, got {}", other)),
    }
    match plan_error("vus = 3\n")? {
        ConfigError::MissingField { field: "vus", .. } => Ok(()),
        other => Err(format!("Expected MissingField, got {}", other)),
    }
}

#[test]
fn executor_requires_its_fields() -> Result<(), String> {
    let err = plan_error(
        r#"
[scenarios.ramp]
executor = "ramping-vus"
start_vus = 2
"#,
    )?;
    match err {
        ConfigError::ExecutorMissingField {
            executor: "ramping-vus",
            field: "stages",
            ..
        } => {}
        other => return Err(format!("Expected ExecutorMissingField, got {}", other)),
    }

    let err = plan_error(
        r#"
[scenarios.steady]
executor = "constant-vus"
vus = 2
"#,
    )?;
    match err {
        ConfigError::ExecutorMissingField {
            field: "duration", ..
        } => Ok(()),
        other => Err(format!("Expected ExecutorMissingField, got {}", other)),
    }
}

#[test]
fn unknown_fields_are_rejected() -> Result<(), String> {
    match parse_config(Path::new("x.toml"), "rate = 10\n") {
        Err(AppError::Config(ConfigError::ParseToml { .. })) => {}
        Err(other) => return Err(format!("Expected ParseToml, got {}", other)),
        Ok(_) => return Err("Expected unknown field to be rejected".to_owned()),
    }
    match parse_config(Path::new("x.yaml"), "") {
        Err(AppError::Config(ConfigError::UnsupportedExtension { ext })) if ext == "yaml" => Ok(()),
        Err(other) => Err(format!("Expected UnsupportedExtension, got {}", other)),
        Ok(_) => Err("Expected yaml to be rejected".to_owned()),
    }
}

#[test]
fn durations_accept_units_and_seconds() -> Result<(), String> {
    let cases = [
        ("500ms", Duration::from_millis(500)),
        ("10s", Duration::from_secs(10)),
        ("1m30s", Duration::from_secs(90)),
        ("2h", Duration::from_secs(7_200)),
        ("1h1m1s250ms", Duration::from_millis(3_661_250)),
        ("45", Duration::from_secs(45)),
        ("0s", Duration::ZERO),
    ];
    for (input, expected) in cases {
        let parsed = parse_duration_value(input)?;
        if parsed != expected {
            return Err(format!("{}: expected {:?}, got {:?}", input, expected, parsed));
        }
    }
    for input in ["", "-5s", "5x", "ms", "1m30"] {
        if parse_duration_value(input).is_ok() {
            return Err(format!("Expected '{}' to be rejected", input));
        }
    }
    let negative = DurationValue::Seconds(-3).to_duration("duration");
    if !matches!(negative, Err(ConfigError::InvalidDuration { .. })) {
        return Err("Expected negative seconds to be rejected".to_owned());
    }
    Ok(())
}

#[test]
fn malformed_threshold_is_a_config_error() -> Result<(), String> {
    let err = plan_error(
        r#"
duration = "1s"
[thresholds]
http_req_duration = ["p(95)<<500"]
"#,
    )?;
    match err {
        ConfigError::InvalidThreshold { metric, .. } if metric == "http_req_duration" => Ok(()),
        other => Err(format!("Expected InvalidThreshold, got {}", other)),
    }
}

#[test]
fn invalid_trend_stat_is_rejected() -> Result<(), String> {
    let err = plan_error(
        r#"
duration = "1s"
summary_trend_stats = ["avg", "p(101)"]
"#,
    )?;
    match err {
        ConfigError::InvalidTrendStat { value } if value == "p(101)" => Ok(()),
        other => Err(format!("Expected InvalidTrendStat, got {}", other)),
    }
}

#[test]
fn base_url_override_and_http_options() -> Result<(), String> {
    let config = parse_toml(
        r#"
base_url = "http://from-file:1"
duration = "1s"
timeout = "2s"
connect_timeout = "500ms"
insecure_skip_tls_verify = true
user_agent = ""
headers = ["Accept: application/json"]
"#,
    )?;
    let plan = build_plan(&config, Some("http://override:2")).map_err(|err| err.to_string())?;
    if plan.http.base_url.as_deref() != Some("http://override:2") {
        return Err("Expected CLI base URL to win".to_owned());
    }
    if plan.http.timeout != Duration::from_secs(2)
        || plan.http.connect_timeout != Duration::from_millis(500)
    {
        return Err("Unexpected timeouts".to_owned());
    }
    if !plan.http.insecure_skip_tls_verify || plan.http.user_agent.is_some() {
        return Err("Unexpected TLS or user agent settings".to_owned());
    }
    if plan.http.headers != vec![("Accept".to_owned(), "application/json".to_owned())] {
        return Err(format!("Unexpected headers: {:?}", plan.http.headers));
    }

    match plan_error("duration = \"1s\"\nheaders = [\"no-colon\"]\n")? {
        ConfigError::InvalidHeader { .. } => Ok(()),
        other => Err(format!("Expected InvalidHeader, got {}", other)),
    }
}
