use std::time::Duration;

use bytes::Bytes;
use rand::Rng;
use serde_json::Value;

use crate::config::types::{Measure, StepConfig, StepMetricConfig, StepMetricKind};
use crate::config::{parse_header, parse_method};
use crate::engine::VuContext;
use crate::error::{ConfigError, ScriptError};
use crate::http::{Method, RequestParams, Response};

#[derive(Debug, Clone)]
pub(super) struct Step {
    method: Method,
    target: String,
    body: Option<Bytes>,
    params: RequestParams,
    expect_status: Option<u16>,
    think_time: Duration,
    think_time_jitter: Duration,
    metrics: Vec<StepMetricConfig>,
}

impl Step {
    pub(super) fn from_config(index: usize, config: &StepConfig) -> Result<Self, ConfigError> {
        let target = config
            .url
            .clone()
            .or_else(|| config.path.clone())
            .filter(|target| !target.trim().is_empty())
            .ok_or(ConfigError::StepMissingUrl { index })?;
        let method = match config.method.as_deref() {
            Some(method) => parse_method(index, method)?,
            None if config.body.is_some() => Method::POST,
            None => Method::GET,
        };

        let mut params = RequestParams::new();
        if let Some(headers) = config.headers.as_ref() {
            params.headers = headers
                .iter()
                .map(|header| parse_header(header))
                .collect::<Result<_, _>>()?;
        }
        params.name = config.name.clone();
        params.tags = config.tags.clone().unwrap_or_default();
        let field = |name: &str| format!("steps[{}].{}", index, name);
        if let Some(timeout) = config.timeout.as_ref() {
            params.timeout = Some(timeout.to_duration(&field("timeout"))?);
        }

        Ok(Self {
            method,
            target,
            body: config.body.clone().map(Bytes::from),
            params,
            expect_status: config.expect_status,
            think_time: config
                .think_time
                .as_ref()
                .map(|value| value.to_duration(&field("think_time")))
                .transpose()?
                .unwrap_or_default(),
            think_time_jitter: config
                .think_time_jitter
                .as_ref()
                .map(|value| value.to_duration(&field("think_time_jitter")))
                .transpose()?
                .unwrap_or_default(),
            metrics: config.metrics.clone().unwrap_or_default(),
        })
    }

    /// Sends the request, checks the status and records step metrics.
    /// Think time applies even when the step fails.
    pub(super) async fn run(&self, ctx: &mut VuContext) -> Result<(), ScriptError> {
        let response = ctx
            .http()
            .request(
                self.method.clone(),
                &self.target,
                self.body.clone(),
                &self.params,
            )
            .await;
        let outcome = self.inspect(ctx, &response);
        let pause = self.think_duration();
        if !pause.is_zero() {
            ctx.sleep(pause).await;
        }
        outcome
    }

    fn inspect(&self, ctx: &VuContext, response: &Response) -> Result<(), ScriptError> {
        if let Some(expected) = self.expect_status {
            let actual = response.status();
            if !ctx.check(&format!("status is {}", expected), actual == expected) {
                return Err(ScriptError::UnexpectedStatus {
                    url: response.url().to_owned(),
                    expected,
                    actual,
                });
            }
        } else if let Some(err) = response.error() {
            return Err(ScriptError::Message(err.to_string()));
        }

        for metric in &self.metrics {
            let value = measure(response, metric)?;
            let mut tags = ctx.tags().clone();
            tags.extend(self.params.tags.clone());
            if let Some(name) = self.params.name.as_ref() {
                tags.insert("name".to_owned(), name.clone());
            }
            let sink = ctx.metrics();
            match metric.kind {
                StepMetricKind::Counter => sink.counter(&metric.metric)?.add(value, &tags),
                StepMetricKind::Trend => sink.trend(&metric.metric)?.add(value, &tags),
                StepMetricKind::Gauge => sink.gauge(&metric.metric)?.set(value, &tags),
            }
        }
        Ok(())
    }

    fn think_duration(&self) -> Duration {
        if self.think_time_jitter.is_zero() {
            return self.think_time;
        }
        let max_jitter = u64::try_from(self.think_time_jitter.as_millis()).unwrap_or(u64::MAX);
        let jitter = rand::thread_rng().gen_range(0..=max_jitter);
        self.think_time.saturating_add(Duration::from_millis(jitter))
    }
}

fn measure(response: &Response, metric: &StepMetricConfig) -> Result<f64, ScriptError> {
    let value = response
        .json_pointer(&metric.pointer)?
        .ok_or_else(|| ScriptError::MissingJsonValue {
            url: response.url().to_owned(),
            pointer: metric.pointer.clone(),
        })?;
    let not_measurable = || ScriptError::NotMeasurable {
        pointer: metric.pointer.clone(),
    };
    match metric.measure {
        Measure::Value => match value {
            Value::Number(number) => number.as_f64().ok_or_else(not_measurable),
            Value::Bool(flag) => Ok(if flag { 1.0 } else { 0.0 }),
            Value::Null | Value::String(_) | Value::Array(_) | Value::Object(_) => {
                Err(not_measurable())
            }
        },
        Measure::Length => {
            let len = match value {
                Value::Array(items) => items.len(),
                Value::Object(fields) => fields.len(),
                Value::String(text) => text.chars().count(),
                Value::Null | Value::Bool(_) | Value::Number(_) => return Err(not_measurable()),
            };
            Ok(len as f64)
        }
    }
}
