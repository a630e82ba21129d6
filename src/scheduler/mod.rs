//! Virtual user scheduler: turns a load profile into concurrent executions.
mod executor;
mod profile;
mod registry;
mod vu;


use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::engine::TestScript;
use crate::http::ClientOptions;
use crate::metrics::{MetricSink, Tags, names};
use crate::shutdown::StopSignal;

pub use profile::{
    DEFAULT_GRACEFUL_STOP, DEFAULT_SCENARIO, Executor, LoadProfile, MAX_SCENARIO_NAME_LEN,
    ScenarioSpec, Stage, target_at, validate_scenario_name,
};

pub(crate) use registry::VuRegistry;
use vu::VuSetup;

/// How often staged controllers re-evaluate their target and the VU gauges
/// are sampled.
pub const SCHEDULER_TICK: Duration = Duration::from_millis(50);

/// Iteration totals of one scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioReport {
    pub name: String,
    pub executor: &'static str,
    pub completed: u64,
    pub failed: u64,
    pub interrupted: u64,
}

/// Everything executions share for one run.
pub(crate) struct RunContext<S: TestScript> {
    pub(crate) script: Arc<S>,
    pub(crate) data: Arc<S::Data>,
    pub(crate) sink: MetricSink,
    pub(crate) http: Arc<ClientOptions>,
    pub(crate) registry: Arc<VuRegistry>,
    pub(crate) abort: StopSignal,
}

/// Runs every scenario of `profile` to completion (or abort) and reports
/// per-scenario totals in name order.
pub(crate) async fn run_profile<S: TestScript>(
    profile: &LoadProfile,
    run: RunContext<S>,
) -> Vec<ScenarioReport> {
    let run_start = Instant::now();
    let mut handles: Vec<(String, JoinHandle<ScenarioReport>)> = Vec::new();
    for (name, spec) in profile.scenarios() {
        let setup = VuSetup {
            scenario: Arc::from(name.as_str()),
            tags: Arc::new(spec.tags.clone()),
            script: Arc::clone(&run.script),
            data: Arc::clone(&run.data),
            sink: run.sink.clone(),
            http: Arc::clone(&run.http),
            pause: spec.pause,
        };
        let handle = tokio::spawn(executor::run_scenario(
            name.clone(),
            spec,
            setup,
            Arc::clone(&run.registry),
            run.abort.clone(),
            run_start,
        ));
        handles.push((name, handle));
    }

    let mut reports = Vec::with_capacity(handles.len());
    for (name, handle) in handles {
        match handle.await {
            Ok(report) => reports.push(report),
            Err(err) => warn!("Scenario '{}' controller failed: {}", name, err),
        }
    }
    reports
}

/// Samples the `vus` and `vus_max` gauges every tick until `finished`.
pub(crate) fn spawn_vu_sampler(
    sink: MetricSink,
    registry: Arc<VuRegistry>,
    finished: StopSignal,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let (Ok(vus), Ok(vus_max)) = (sink.gauge(names::VUS), sink.gauge(names::VUS_MAX)) else {
            debug!("VU gauges unavailable");
            return;
        };
        let tags = Tags::new();
        let mut tick = tokio::time::interval(SCHEDULER_TICK);
        loop {
            tokio::select! {
                () = finished.wait() => break,
                _ = tick.tick() => {}
            }
            vus.set(registry.running() as f64, &tags);
            vus_max.set(registry.allocated() as f64, &tags);
        }
        vus.set(registry.running() as f64, &tags);
        vus_max.set(registry.allocated() as f64, &tags);
    })
}
