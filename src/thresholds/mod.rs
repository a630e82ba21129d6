//! Threshold expressions: parsing, final evaluation, and the mid-test abort
//! watcher.
mod evaluate;
mod parse;
mod watcher;


pub use evaluate::{ThresholdResult, all_passed, evaluate, evaluate_one, evaluate_snapshot};
pub use parse::{Aggregation, Comparison, Threshold, ThresholdExpr};
pub use watcher::{ABORT_EVAL_INTERVAL, AbortReport, spawn_abort_watcher};
