use super::{MetricKind, ValueType};

/// Names of the metrics the engine records on its own.
pub mod names {
    pub const HTTP_REQS: &str = "http_reqs";
    pub const HTTP_REQ_FAILED: &str = "http_req_failed";
    pub const HTTP_REQ_DURATION: &str = "http_req_duration";
    pub const HTTP_REQ_BLOCKED: &str = "http_req_blocked";
    pub const HTTP_REQ_CONNECTING: &str = "http_req_connecting";
    pub const HTTP_REQ_TLS_HANDSHAKING: &str = "http_req_tls_handshaking";
    pub const HTTP_REQ_SENDING: &str = "http_req_sending";
    pub const HTTP_REQ_WAITING: &str = "http_req_waiting";
    pub const HTTP_REQ_RECEIVING: &str = "http_req_receiving";
    pub const DATA_SENT: &str = "data_sent";
    pub const DATA_RECEIVED: &str = "data_received";
    pub const ITERATIONS: &str = "iterations";
    pub const ITERATIONS_FAILED: &str = "iterations_failed";
    pub const ITERATIONS_INTERRUPTED: &str = "iterations_interrupted";
    pub const ITERATION_DURATION: &str = "iteration_duration";
    pub const CHECKS: &str = "checks";
    pub const VUS: &str = "vus";
    pub const VUS_MAX: &str = "vus_max";
}

pub(crate) const BUILTIN_METRICS: [(&str, MetricKind, ValueType); 18] = [
    (names::HTTP_REQS, MetricKind::Counter, ValueType::Default),
    (names::HTTP_REQ_FAILED, MetricKind::Rate, ValueType::Default),
    (names::HTTP_REQ_DURATION, MetricKind::Trend, ValueType::Time),
    (names::HTTP_REQ_BLOCKED, MetricKind::Trend, ValueType::Time),
    (names::HTTP_REQ_CONNECTING, MetricKind::Trend, ValueType::Time),
    (names::HTTP_REQ_TLS_HANDSHAKING, MetricKind::Trend, ValueType::Time),
    (names::HTTP_REQ_SENDING, MetricKind::Trend, ValueType::Time),
    (names::HTTP_REQ_WAITING, MetricKind::Trend, ValueType::Time),
    (names::HTTP_REQ_RECEIVING, MetricKind::Trend, ValueType::Time),
    (names::DATA_SENT, MetricKind::Counter, ValueType::Data),
    (names::DATA_RECEIVED, MetricKind::Counter, ValueType::Data),
    (names::ITERATIONS, MetricKind::Counter, ValueType::Default),
    (names::ITERATIONS_FAILED, MetricKind::Counter, ValueType::Default),
    (names::ITERATIONS_INTERRUPTED, MetricKind::Counter, ValueType::Default),
    (names::ITERATION_DURATION, MetricKind::Trend, ValueType::Time),
    (names::CHECKS, MetricKind::Rate, ValueType::Default),
    (names::VUS, MetricKind::Gauge, ValueType::Default),
    (names::VUS_MAX, MetricKind::Gauge, ValueType::Default),
];

/// Kind of a built-in metric, `None` for custom names.
#[must_use]
pub fn builtin_kind(name: &str) -> Option<MetricKind> {
    BUILTIN_METRICS
        .iter()
        .find(|(builtin, _, _)| *builtin == name)
        .map(|(_, kind, _)| *kind)
}
