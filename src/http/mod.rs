//! HTTP exec client: HTTP/1.1 requests with per-phase timing samples.
mod client;
mod connection;
mod options;
mod response;
mod timings;


pub use client::HttpClient;
pub use http::Method;
pub use options::{ClientOptions, RequestParams};
pub use response::Response;
pub use timings::Timings;
pub(crate) use timings::as_millis_f64;
