use std::ops::RangeInclusive;
use std::time::Duration;

use crate::metrics::Tags;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
/// Default TCP connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Default User-Agent header.
pub const DEFAULT_USER_AGENT: &str = concat!("stampede/", env!("CARGO_PKG_VERSION"));

/// Settings shared by every client of a run.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Base target for relative paths and `${BASE_URL}` placeholders.
    pub base_url: Option<String>,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub insecure_skip_tls_verify: bool,
    pub user_agent: Option<String>,
    /// Statuses that count as success in `http_req_failed`.
    pub expected_statuses: RangeInclusive<u16>,
    pub headers: Vec<(String, String)>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            insecure_skip_tls_verify: false,
            user_agent: Some(DEFAULT_USER_AGENT.to_owned()),
            expected_statuses: 200..=399,
            headers: Vec::new(),
        }
    }
}

/// Per-request knobs.
#[derive(Debug, Clone, Default)]
pub struct RequestParams {
    pub headers: Vec<(String, String)>,
    /// Value of the `name` tag; defaults to the request URL.
    pub name: Option<String>,
    pub tags: Tags,
    pub timeout: Option<Duration>,
}

impl RequestParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers.push((key.to_owned(), value.to_owned()));
        self
    }

    #[must_use]
    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_owned());
        self
    }

    #[must_use]
    pub fn tag(mut self, key: &str, value: &str) -> Self {
        self.tags.insert(key.to_owned(), value.to_owned());
        self
    }

    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
