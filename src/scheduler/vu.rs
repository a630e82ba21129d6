use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::engine::{TestScript, VuContext};
use crate::http::{ClientOptions, as_millis_f64};
use crate::metrics::{MetricSink, Tags, names};
use crate::shutdown::StopSignal;

use super::registry::VuLease;

/// How many iterations an execution may still start.
#[derive(Debug, Clone)]
pub(crate) enum IterationBudget {
    Unlimited,
    PerVu(u64),
    Shared(Arc<AtomicU64>),
}

impl IterationBudget {
    fn take(&mut self) -> bool {
        match self {
            IterationBudget::Unlimited => true,
            IterationBudget::PerVu(remaining) => {
                if *remaining == 0 {
                    return false;
                }
                *remaining = remaining.saturating_sub(1);
                true
            }
            IterationBudget::Shared(pool) => pool
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
                .is_ok(),
        }
    }
}

/// Stop conditions an execution observes.
#[derive(Debug, Clone)]
pub(crate) struct VuControl {
    /// Set by the pool on ramp-down; honoured between iterations.
    pub(crate) retire: Arc<AtomicBool>,
    /// Scenario over: no new iterations.
    pub(crate) wind_down: StopSignal,
    /// Graceful stop expired: interrupt in-flight work.
    pub(crate) hard_stop: StopSignal,
    /// Whole run aborted.
    pub(crate) abort: StopSignal,
}

impl VuControl {
    fn may_start(&self) -> bool {
        !self.retire.load(Ordering::SeqCst)
            && !self.wind_down.is_triggered()
            && !self.hard_stop.is_triggered()
            && !self.abort.is_triggered()
    }

    async fn interrupted(&self) {
        tokio::select! {
            () = self.hard_stop.wait() => {}
            () = self.abort.wait() => {}
        }
    }

    async fn stop_pausing(&self) {
        tokio::select! {
            () = self.wind_down.wait() => {}
            () = self.interrupted() => {}
        }
    }
}

/// What an execution did before exiting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct VuStats {
    pub(crate) completed: u64,
    pub(crate) failed: u64,
    pub(crate) interrupted: u64,
}

pub(crate) struct VuSetup<S: TestScript> {
    pub(crate) scenario: Arc<str>,
    pub(crate) tags: Arc<Tags>,
    pub(crate) script: Arc<S>,
    pub(crate) data: Arc<S::Data>,
    pub(crate) sink: MetricSink,
    pub(crate) http: Arc<ClientOptions>,
    pub(crate) pause: Option<Duration>,
}

impl<S: TestScript> Clone for VuSetup<S> {
    fn clone(&self) -> Self {
        Self {
            scenario: Arc::clone(&self.scenario),
            tags: Arc::clone(&self.tags),
            script: Arc::clone(&self.script),
            data: Arc::clone(&self.data),
            sink: self.sink.clone(),
            http: Arc::clone(&self.http),
            pause: self.pause,
        }
    }
}

/// Iteration loop of one execution.
///
/// Runs until retired, wound down, out of budget, or interrupted. Retirement
/// and wind-down are checked only between iterations; interruption cancels
/// the iteration at its next suspension point.
pub(crate) async fn run_vu<S: TestScript>(
    setup: VuSetup<S>,
    lease: VuLease,
    control: VuControl,
    mut budget: IterationBudget,
) -> VuStats {
    let mut ctx = VuContext::new(
        lease.id(),
        &setup.scenario,
        &setup.tags,
        setup.sink.clone(),
        Arc::clone(&setup.http),
    );
    let tags = ctx.tags().clone();
    let handles = (
        setup.sink.counter(names::ITERATIONS),
        setup.sink.trend(names::ITERATION_DURATION),
        setup.sink.counter(names::ITERATIONS_FAILED),
        setup.sink.counter(names::ITERATIONS_INTERRUPTED),
    );
    let (Ok(iterations), Ok(duration), Ok(failed), Ok(interrupted)) = handles else {
        debug!("Built-in iteration metrics unavailable for VU {}", lease.id());
        return VuStats::default();
    };

    let mut stats = VuStats::default();
    let mut iteration: u64 = 0;
    while control.may_start() && budget.take() {
        ctx.set_iteration(iteration);
        let started = Instant::now();
        let outcome = tokio::select! {
            biased;
            () = control.interrupted() => None,
            result = setup.script.iteration(&mut ctx, &setup.data) => Some(result),
        };
        let Some(result) = outcome else {
            interrupted.increment(&tags);
            stats.interrupted = stats.interrupted.saturating_add(1);
            break;
        };

        iterations.increment(&tags);
        duration.add(as_millis_f64(started.elapsed()), &tags);
        stats.completed = stats.completed.saturating_add(1);
        if let Err(err) = result {
            failed.increment(&tags);
            stats.failed = stats.failed.saturating_add(1);
            debug!(
                "VU {} iteration {} in '{}' failed: {}",
                lease.id(),
                iteration,
                setup.scenario,
                err
            );
        }
        iteration = iteration.saturating_add(1);

        if let Some(pause) = setup.pause {
            tokio::select! {
                () = control.stop_pausing() => break,
                () = tokio::time::sleep(pause) => {}
            }
        }
    }

    drop(lease);
    stats
}
