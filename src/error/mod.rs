mod app;
mod config;
mod http;
mod metrics;
mod script;
mod threshold;

pub use app::{AppError, AppResult};
pub use config::ConfigError;
pub use http::RequestError;
pub use metrics::MetricsError;
pub use script::ScriptError;
pub use threshold::ThresholdError;
