//! Lifecycle orchestration: `Init -> Setup -> Running -> Teardown ->
//! Summarized`.
mod context;
mod plan;
mod result;
mod script;


use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::error::{ConfigError, ScriptError};
use crate::metrics::MetricSink;
use crate::scheduler::{RunContext, VuRegistry, run_profile, spawn_vu_sampler};
use crate::shutdown::StopSignal;
use crate::thresholds::{all_passed, evaluate, spawn_abort_watcher};

pub use context::VuContext;
pub use plan::{DEFAULT_LIFECYCLE_TIMEOUT, TestPlan, TrendStat};
pub use result::{MetricSummary, Phase, TestOutcome, TestResult, summarize_metrics};
pub use script::TestScript;

const SETUP_SCENARIO: &str = "setup";
const TEARDOWN_SCENARIO: &str = "teardown";

/// Runs one test plan against a script.
pub struct Engine {
    plan: TestPlan,
    sink: MetricSink,
    interrupt: StopSignal,
}

impl Engine {
    /// Validates `plan` and prepares the metric sink, including submetrics
    /// named by thresholds.
    ///
    /// # Errors
    ///
    /// Returns the first configuration problem found; the test never starts.
    pub fn new(plan: TestPlan) -> Result<Self, ConfigError> {
        debug!("Entering {} phase", Phase::Init);
        plan.validate()?;
        let sink = MetricSink::with_submetrics(
            plan.thresholds
                .iter()
                .map(|threshold| threshold.selector.clone()),
        );
        Ok(Self {
            plan,
            sink,
            interrupt: StopSignal::new(),
        })
    }

    #[must_use]
    pub const fn plan(&self) -> &TestPlan {
        &self.plan
    }

    #[must_use]
    pub const fn sink(&self) -> &MetricSink {
        &self.sink
    }

    /// Triggering the returned signal stops the run as if interrupted by the
    /// user; teardown still runs.
    #[must_use]
    pub fn interrupt_signal(&self) -> StopSignal {
        self.interrupt.clone()
    }

    /// Runs the whole lifecycle. Never fails: setup errors, iteration errors,
    /// and threshold failures are all reported in the result.
    pub async fn run<S: TestScript>(&self, script: Arc<S>) -> TestResult {
        let started_at = Utc::now();
        let started = Instant::now();
        let http = Arc::new(self.plan.http.clone());

        debug!("Entering {} phase", Phase::Setup);
        let mut setup_ctx = VuContext::new(
            0,
            SETUP_SCENARIO,
            &crate::metrics::Tags::new(),
            self.sink.clone(),
            Arc::clone(&http),
        );
        let setup = lifecycle_timeout(
            "setup",
            self.plan.setup_timeout,
            script.setup(&mut setup_ctx),
        )
        .await;
        let data = match setup {
            Ok(data) => Arc::new(data),
            Err(err) => {
                error!("Setup failed: {}", err);
                debug!("Entering {} phase", Phase::Summarized);
                return TestResult::setup_failed(started_at, started.elapsed(), err.to_string());
            }
        };

        debug!("Entering {} phase", Phase::Running);
        info!(
            "Running {} scenario(s), up to {} VUs for {:?}",
            self.plan.profile.scenarios().len(),
            self.plan.profile.max_vus(),
            self.plan.profile.max_duration()
        );
        let abort = StopSignal::new();
        let finished = StopSignal::new();
        let registry = Arc::new(VuRegistry::default());
        let running_since = Instant::now();

        let watcher = spawn_abort_watcher(
            self.sink.clone(),
            &self.plan.thresholds,
            running_since,
            self.plan.abort_eval_interval,
            abort.clone(),
            finished.clone(),
        );
        let sampler = spawn_vu_sampler(self.sink.clone(), Arc::clone(&registry), finished.clone());
        let relay = {
            let interrupt = self.interrupt.clone();
            let abort = abort.clone();
            let finished = finished.clone();
            tokio::spawn(async move {
                tokio::select! {
                    () = interrupt.wait() => abort.trigger(),
                    () = finished.wait() => {}
                }
            })
        };

        let scenarios = run_profile(
            &self.plan.profile,
            RunContext {
                script: Arc::clone(&script),
                data: Arc::clone(&data),
                sink: self.sink.clone(),
                http: Arc::clone(&http),
                registry,
                abort,
            },
        )
        .await;
        let elapsed = running_since.elapsed();
        finished.trigger();

        let aborted_by = match watcher {
            Some(handle) => match handle.await {
                Ok(report) => report.map(|report| report.result),
                Err(err) => {
                    warn!("Abort watcher failed: {}", err);
                    None
                }
            },
            None => None,
        };
        for (name, handle) in [("VU sampler", sampler), ("interrupt relay", relay)] {
            if let Err(err) = handle.await {
                warn!("{} failed: {}", name, err);
            }
        }

        let thresholds = evaluate(&self.sink, &self.plan.thresholds, elapsed);
        let outcome = if aborted_by.is_some() {
            TestOutcome::AbortedByThreshold
        } else if self.interrupt.is_triggered() {
            TestOutcome::Interrupted
        } else if all_passed(&thresholds) {
            TestOutcome::Completed
        } else {
            TestOutcome::ThresholdsFailed
        };
        let metrics = summarize_metrics(
            &self.sink.snapshot_all(),
            &self.plan.summary_trend_stats,
            elapsed,
            &thresholds,
        );
        let mut result = TestResult {
            passed: outcome == TestOutcome::Completed,
            outcome,
            started_at,
            duration: elapsed,
            thresholds,
            metrics,
            scenarios,
            aborted_by,
            setup_error: None,
            teardown_error: None,
        };

        debug!("Entering {} phase", Phase::Teardown);
        let mut teardown_ctx = VuContext::new(
            0,
            TEARDOWN_SCENARIO,
            &crate::metrics::Tags::new(),
            self.sink.clone(),
            http,
        );
        let teardown = lifecycle_timeout(
            "teardown",
            self.plan.teardown_timeout,
            script.teardown(&mut teardown_ctx, &data),
        )
        .await;
        if let Err(err) = teardown {
            warn!("Teardown failed: {}", err);
            result.teardown_error = Some(err.to_string());
        }

        debug!("Entering {} phase", Phase::Summarized);
        info!(
            "Test {} after {:?}: {} iterations",
            result.outcome,
            result.duration,
            result.iterations()
        );
        result
    }
}

async fn lifecycle_timeout<T, F>(
    phase: &'static str,
    limit: Duration,
    future: F,
) -> Result<T, ScriptError>
where
    F: std::future::Future<Output = Result<T, ScriptError>>,
{
    tokio::time::timeout(limit, future)
        .await
        .unwrap_or_else(|_elapsed| {
            Err(ScriptError::Timeout {
                phase,
                timeout_ms: limit.as_millis(),
            })
        })
}
