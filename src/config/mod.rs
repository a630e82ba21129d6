//! Config file loading and conversion into a [`TestPlan`](crate::engine::TestPlan).
mod build;
mod loader;
mod parse;
pub mod types;

#[cfg(test)]
mod tests;

pub use build::{DEFAULT_MAX_DURATION, build_plan};
pub use loader::load_config;

#[cfg(test)]
pub(crate) use loader::load_config_file;
#[cfg(any(test, feature = "fuzzing"))]
pub(crate) use loader::parse_config;
#[cfg(any(test, feature = "fuzzing"))]
pub(crate) use parse::parse_duration_value;
pub(crate) use parse::{parse_header, parse_method};
