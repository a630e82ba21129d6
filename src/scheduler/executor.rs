use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::task::{JoinError, JoinHandle};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::engine::TestScript;
use crate::shutdown::StopSignal;

use super::registry::VuRegistry;
use super::vu::{IterationBudget, VuControl, VuSetup, VuStats, run_vu};
use super::{Executor, SCHEDULER_TICK, ScenarioReport, ScenarioSpec, target_at};

struct ActiveVu {
    retire: Arc<AtomicBool>,
    handle: JoinHandle<VuStats>,
}

/// Executions of one scenario, in start order.
struct VuPool<S: TestScript> {
    setup: VuSetup<S>,
    registry: Arc<VuRegistry>,
    wind_down: StopSignal,
    hard_stop: StopSignal,
    abort: StopSignal,
    active: Vec<ActiveVu>,
    retiring: Vec<JoinHandle<VuStats>>,
    totals: VuStats,
}

impl<S: TestScript> VuPool<S> {
    fn new(setup: VuSetup<S>, registry: Arc<VuRegistry>, abort: StopSignal) -> Self {
        Self {
            setup,
            registry,
            wind_down: StopSignal::new(),
            hard_stop: StopSignal::new(),
            abort,
            active: Vec::new(),
            retiring: Vec::new(),
            totals: VuStats::default(),
        }
    }

    fn spawn(&mut self, budget: IterationBudget) {
        let retire = Arc::new(AtomicBool::new(false));
        let control = VuControl {
            retire: Arc::clone(&retire),
            wind_down: self.wind_down.clone(),
            hard_stop: self.hard_stop.clone(),
            abort: self.abort.clone(),
        };
        let lease = self.registry.lease();
        debug!("Starting VU {} in '{}'", lease.id(), self.setup.scenario);
        let handle = tokio::spawn(run_vu(self.setup.clone(), lease, control, budget));
        self.active.push(ActiveVu { retire, handle });
    }

    /// Grows or shrinks the live set to `target`. Shrinking retires the most
    /// recently started executions; they leave after their current iteration.
    fn scale_to(&mut self, target: u64) {
        let target = usize::try_from(target).unwrap_or(usize::MAX);
        while self.active.len() < target {
            self.spawn(IterationBudget::Unlimited);
        }
        while self.active.len() > target {
            let Some(vu) = self.active.pop() else {
                break;
            };
            vu.retire.store(true, Ordering::SeqCst);
            self.retiring.push(vu.handle);
        }
    }

    /// Collects executions that already exited.
    async fn reap(&mut self) {
        let (done, retiring): (Vec<_>, Vec<_>) = self
            .retiring
            .drain(..)
            .partition(JoinHandle::is_finished);
        self.retiring = retiring;
        for handle in done {
            let joined = handle.await;
            self.absorb(joined);
        }

        let (done, active): (Vec<_>, Vec<_>) = self
            .active
            .drain(..)
            .partition(|vu| vu.handle.is_finished());
        self.active = active;
        for vu in done {
            let joined = vu.handle.await;
            self.absorb(joined);
        }
    }

    /// Resolves once every live execution has exited on its own.
    async fn idle(&self) {
        let mut tick = tokio::time::interval(SCHEDULER_TICK);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tick.tick().await;
            if self.active.iter().all(|vu| vu.handle.is_finished()) {
                return;
            }
        }
    }

    /// Stops new iterations and waits up to `graceful_stop` for in-flight ones
    /// before interrupting them.
    async fn finish(mut self, graceful_stop: Duration) -> VuStats {
        self.wind_down.trigger();
        let mut pending: Vec<JoinHandle<VuStats>> = self.retiring.drain(..).collect();
        pending.extend(self.active.drain(..).map(|vu| vu.handle));

        let grace = tokio::time::sleep(graceful_stop);
        tokio::pin!(grace);
        for mut handle in pending {
            if !self.hard_stop.is_triggered() {
                tokio::select! {
                    joined = &mut handle => {
                        self.absorb(joined);
                        continue;
                    }
                    () = &mut grace => {
                        debug!(
                            "Graceful stop of '{}' expired, interrupting iterations",
                            self.setup.scenario
                        );
                        self.hard_stop.trigger();
                    }
                    () = self.abort.wait() => {
                        self.hard_stop.trigger();
                    }
                }
            }
            let joined = handle.await;
            self.absorb(joined);
        }
        self.totals
    }

    fn absorb(&mut self, joined: Result<VuStats, JoinError>) {
        match joined {
            Ok(stats) => {
                self.totals.completed = self.totals.completed.saturating_add(stats.completed);
                self.totals.failed = self.totals.failed.saturating_add(stats.failed);
                self.totals.interrupted = self.totals.interrupted.saturating_add(stats.interrupted);
            }
            Err(err) => warn!("VU task in '{}' ended abnormally: {}", self.setup.scenario, err),
        }
    }
}

/// Runs one scenario from its start offset to the end of its graceful stop.
pub(crate) async fn run_scenario<S: TestScript>(
    name: String,
    spec: ScenarioSpec,
    setup: VuSetup<S>,
    registry: Arc<VuRegistry>,
    abort: StopSignal,
    run_start: Instant,
) -> ScenarioReport {
    let mut report = ScenarioReport {
        name,
        executor: spec.executor.name(),
        completed: 0,
        failed: 0,
        interrupted: 0,
    };

    let start_at = run_start
        .checked_add(spec.start_time)
        .unwrap_or_else(Instant::now);
    tokio::select! {
        () = abort.wait() => return report,
        () = tokio::time::sleep_until(start_at) => {}
    }
    info!(
        "Scenario '{}' started ({}, up to {} VUs)",
        report.name,
        report.executor,
        spec.executor.max_vus()
    );

    let mut pool = VuPool::new(setup, registry, abort.clone());
    let started = Instant::now();
    match &spec.executor {
        Executor::RampingVus { start_vus, stages } => {
            let end = started
                .checked_add(spec.executor.duration())
                .unwrap_or(started);
            let mut tick = tokio::time::interval(SCHEDULER_TICK);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = abort.wait() => break,
                    _ = tick.tick() => {}
                }
                let now = Instant::now();
                if now >= end {
                    break;
                }
                pool.reap().await;
                pool.scale_to(target_at(
                    *start_vus,
                    stages,
                    now.saturating_duration_since(started),
                ));
            }
        }
        Executor::ConstantVus { vus, duration } => {
            pool.scale_to(*vus);
            tokio::select! {
                () = abort.wait() => {}
                () = tokio::time::sleep(*duration) => {}
            }
        }
        Executor::PerVuIterations {
            vus,
            iterations,
            max_duration,
        } => {
            for _ in 0..*vus {
                pool.spawn(IterationBudget::PerVu(*iterations));
            }
            tokio::select! {
                () = abort.wait() => {}
                () = tokio::time::sleep(*max_duration) => {}
                () = pool.idle() => {}
            }
        }
        Executor::SharedIterations {
            vus,
            iterations,
            max_duration,
        } => {
            let shared = Arc::new(AtomicU64::new(*iterations));
            for _ in 0..*vus {
                pool.spawn(IterationBudget::Shared(Arc::clone(&shared)));
            }
            tokio::select! {
                () = abort.wait() => {}
                () = tokio::time::sleep(*max_duration) => {}
                () = pool.idle() => {}
            }
        }
    }

    let totals = pool.finish(spec.graceful_stop).await;
    report.completed = totals.completed;
    report.failed = totals.failed;
    report.interrupted = totals.interrupted;
    info!(
        "Scenario '{}' finished: {} iterations, {} interrupted",
        report.name, report.completed, report.interrupted
    );
    report
}
