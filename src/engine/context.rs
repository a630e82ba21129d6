use std::sync::Arc;
use std::time::Duration;

use crate::http::{ClientOptions, HttpClient};
use crate::metrics::{MetricSink, Sample, Tags, names};

/// Per-execution state handed to script callbacks.
pub struct VuContext {
    vu_id: u64,
    scenario: String,
    iteration: u64,
    tags: Tags,
    http: HttpClient,
    sink: MetricSink,
}

impl VuContext {
    /// Context for execution `vu_id` of `scenario`. Every sample recorded
    /// through it carries `tags` plus the `scenario` tag.
    #[must_use]
    pub fn new(
        vu_id: u64,
        scenario: &str,
        tags: &Tags,
        sink: MetricSink,
        options: Arc<ClientOptions>,
    ) -> Self {
        let mut tags = tags.clone();
        tags.insert("scenario".to_owned(), scenario.to_owned());
        Self {
            vu_id,
            scenario: scenario.to_owned(),
            iteration: 0,
            http: HttpClient::new(sink.clone(), options, tags.clone()),
            tags,
            sink,
        }
    }

    /// Stable id of this execution; 0 for setup and teardown.
    #[must_use]
    pub const fn vu_id(&self) -> u64 {
        self.vu_id
    }

    #[must_use]
    pub fn scenario(&self) -> &str {
        &self.scenario
    }

    /// Zero-based iteration counter of this execution.
    #[must_use]
    pub const fn iteration(&self) -> u64 {
        self.iteration
    }

    #[must_use]
    pub const fn tags(&self) -> &Tags {
        &self.tags
    }

    pub const fn http(&mut self) -> &mut HttpClient {
        &mut self.http
    }

    #[must_use]
    pub const fn metrics(&self) -> &MetricSink {
        &self.sink
    }

    /// Records a named check into the `checks` rate and returns `passed`.
    pub fn check(&self, name: &str, passed: bool) -> bool {
        let mut tags = self.tags.clone();
        tags.insert("check".to_owned(), name.to_owned());
        if let Err(err) = self.sink.record(&Sample::rate(names::CHECKS, passed, tags)) {
            tracing::debug!("Failed to record check '{}': {}", name, err);
        }
        passed
    }

    /// Suspends this execution without blocking others.
    pub async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    pub(crate) const fn set_iteration(&mut self, iteration: u64) {
        self.iteration = iteration;
    }
}
