use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::metrics::MetricSink;
use crate::shutdown::StopSignal;

use super::{Threshold, ThresholdResult, evaluate_snapshot};

/// How often abort thresholds are re-evaluated while the test runs.
pub const ABORT_EVAL_INTERVAL: Duration = Duration::from_secs(2);

/// The abort threshold that stopped the run.
#[derive(Debug, Clone)]
pub struct AbortReport {
    pub result: ThresholdResult,
    pub elapsed: Duration,
}

/// Spawns the mid-test watcher for thresholds marked `abort_on_fail`.
///
/// Returns `None` when no threshold can abort. The task triggers `abort` on
/// the first failing abort threshold and exits when `finished` fires.
/// Metrics with no samples yet are skipped until they have data.
#[must_use]
pub fn spawn_abort_watcher(
    sink: MetricSink,
    thresholds: &[Threshold],
    started: Instant,
    interval: Duration,
    abort: StopSignal,
    finished: StopSignal,
) -> Option<JoinHandle<Option<AbortReport>>> {
    let watched: Arc<[Threshold]> = thresholds
        .iter()
        .filter(|threshold| threshold.abort_on_fail)
        .cloned()
        .collect();
    if watched.is_empty() {
        return None;
    }

    Some(tokio::spawn(async move {
        loop {
            tokio::select! {
                () = finished.wait() => return None,
                () = tokio::time::sleep(interval) => {}
            }
            let elapsed = started.elapsed();
            for threshold in watched.iter() {
                if elapsed < threshold.delay_abort_eval {
                    continue;
                }
                let Some(snapshot) = sink.snapshot_selector(&threshold.selector) else {
                    debug!("Abort threshold on {} has no data yet", threshold.selector);
                    continue;
                };
                let result = evaluate_snapshot(threshold, Some(&snapshot), elapsed);
                if result.passed {
                    continue;
                }
                warn!(
                    "Threshold {} '{}' crossed after {:?}, aborting the test.",
                    result.metric, result.expression, elapsed
                );
                abort.trigger();
                return Some(AbortReport { result, elapsed });
            }
        }
    }))
}
