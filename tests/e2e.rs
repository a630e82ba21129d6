mod support;

use std::fs;
use std::path::Path;

use tempfile::tempdir;

use support::{describe, run_stampede, spawn_http_server};

fn write_config(dir: &Path, name: &str, content: &str) -> Result<String, String> {
    let path = dir.join(name);
    fs::write(&path, content).map_err(|err| format!("write config failed: {}", err))?;
    Ok(path.to_string_lossy().into_owned())
}

fn read_summary(path: &Path) -> Result<serde_json::Value, String> {
    let content = fs::read_to_string(path).map_err(|err| format!("read summary failed: {}", err))?;
    serde_json::from_str(&content).map_err(|err| format!("parse summary failed: {}", err))
}

fn pizza_config(base_url: &str) -> String {
    format!(
        r#"
base_url = "{}"
stages = [{{ duration = "1s", target = 2 }}]

[thresholds]
http_req_failed = ["rate<0.01"]
checks = ["rate>0.99"]

[[steps]]
name = "recommend"
method = "POST"
path = "/api/pizza"
headers = ["X-User-ID: 23423", "Content-Type: application/json"]
body = '{{"maxCaloriesPerSlice": 500}}'
expect_status = 200
think_time = "100ms"

[[steps.metrics]]
metric = "quickpizza_ingredients"
kind = "trend"
pointer = "/pizza/ingredients"
measure = "length"
"#,
        base_url
    )
}

#[test]
fn e2e_pizza_config_passes() -> Result<(), String> {
    let (url, _server) = spawn_http_server()?;
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let config = write_config(dir.path(), "pizza.toml", &pizza_config(&url))?;
    let summary_path = dir.path().join("summary.json");

    let output = run_stampede([
        "--config",
        config.as_str(),
        "--summary-export",
        &summary_path.to_string_lossy(),
        "--no-color",
    ])?;
    if output.status.code() != Some(0) {
        return Err(describe(&output));
    }

    let summary = read_summary(&summary_path)?;
    if summary.pointer("/passed") != Some(&serde_json::json!(true)) {
        return Err(format!("Expected a passing summary: {}", summary));
    }
    let requests = summary
        .pointer("/metrics/http_reqs/values/count")
        .and_then(serde_json::Value::as_f64)
        .unwrap_or(0.0);
    if requests < 2.0 {
        return Err(format!("Expected at least 2 requests, got {}", requests));
    }
    let ingredients = summary
        .pointer("/metrics/quickpizza_ingredients/values/avg")
        .and_then(serde_json::Value::as_f64);
    if ingredients != Some(2.0) {
        return Err(format!("Expected ingredient avg 2, got {:?}", ingredients));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.contains("Outcome: completed (passed)") {
        return Err(format!("Missing text summary:\n{}", stdout));
    }
    Ok(())
}

#[test]
fn e2e_failed_threshold_exits_99() -> Result<(), String> {
    let (url, _server) = spawn_http_server()?;
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let config = write_config(
        dir.path(),
        "failing.toml",
        r#"
vus = 1
iterations = 3

[thresholds]
http_req_failed = ["rate<0.01"]

[[steps]]
path = "/fail"
"#,
    )?;

    let output = run_stampede(["--config", config.as_str(), "--base-url", url.as_str(), "-q"])?;
    if output.status.code() != Some(99) {
        return Err(describe(&output));
    }
    if !output.stdout.is_empty() {
        return Err(format!("--quiet must not print a summary: {}", describe(&output)));
    }
    Ok(())
}

#[test]
fn e2e_invalid_config_exits_104() -> Result<(), String> {
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let negative = write_config(
        dir.path(),
        "negative.toml",
        r#"
stages = [{ duration = "1s", target = -3 }]

[[steps]]
url = "http://127.0.0.1:1/"
"#,
    )?;
    let output = run_stampede(["--config", negative.as_str()])?;
    if output.status.code() != Some(104) {
        return Err(describe(&output));
    }

    let missing = dir.path().join("missing.toml");
    let output = run_stampede(["--config", &missing.to_string_lossy()])?;
    if output.status.code() != Some(104) {
        return Err(describe(&output));
    }

    let no_steps = write_config(dir.path(), "no_steps.json", r#"{ "vus": 1, "duration": "1s" }"#)?;
    let output = run_stampede(["--config", no_steps.as_str()])?;
    if output.status.code() != Some(104) {
        return Err(describe(&output));
    }
    Ok(())
}

#[test]
fn e2e_shared_iterations_run_exactly() -> Result<(), String> {
    let (url, _server) = spawn_http_server()?;
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let config = write_config(
        dir.path(),
        "shared.json",
        &format!(
            r#"{{
                "base_url": "{}",
                "scenarios": {{
                    "orders": {{ "executor": "shared-iterations", "vus": 3, "iterations": 9 }}
                }},
                "steps": [{{ "path": "/", "expect_status": 200 }}]
            }}"#,
            url
        ),
    )?;
    let summary_path = dir.path().join("shared-summary.json");
    let output = run_stampede([
        "--config",
        config.as_str(),
        "--summary-export",
        &summary_path.to_string_lossy(),
        "-q",
    ])?;
    if output.status.code() != Some(0) {
        return Err(describe(&output));
    }
    let summary = read_summary(&summary_path)?;
    let completed = summary
        .pointer("/scenarios/0/completed")
        .and_then(serde_json::Value::as_u64);
    if completed != Some(9) {
        return Err(format!("Expected 9 iterations, got {:?}", completed));
    }
    Ok(())
}
