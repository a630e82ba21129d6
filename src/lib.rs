//! Core library for the `stampede` load generator.
//!
//! The engine drives virtual users through a declarative load profile,
//! times every HTTP request phase into a shared metric sink, and checks
//! pass/fail thresholds at the end of the run (and periodically for
//! abort-on-fail thresholds). Scripts are Rust values implementing
//! [`engine::TestScript`]; the `stampede` binary runs declarative request
//! steps from a TOML or JSON config file.
pub mod args;
pub mod config;
pub mod engine;
pub mod entry;
pub mod error;
pub mod http;
pub mod metrics;
pub mod scheduler;
pub mod script;
pub mod shutdown;
pub mod shutdown_handlers;
pub mod summary;
pub(crate) mod system;
pub mod thresholds;

#[cfg(feature = "fuzzing")]
pub mod fuzzing;

#[cfg(test)]
mod test_support;
