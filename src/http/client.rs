use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{CONNECTION, HOST, USER_AGENT};
use http::{HeaderMap, Method};
use http_body_util::{BodyExt, Full};
use tokio::time::Instant;
use tokio_native_tls::TlsConnector;
use tracing::debug;
use url::Url;

use crate::error::RequestError;
use crate::metrics::{MetricKind, MetricSink, Sample, Tags, names};

use super::connection::{
    MaybeTlsStream, Origin, PooledConnection, connect_tcp, handshake, tls_handshake,
};
use super::timings::as_millis_f64;
use super::{ClientOptions, RequestParams, Response, Timings};

/// Placeholders replaced by the base URL.
const BASE_URL_PLACEHOLDERS: [&str; 2] = ["${BASE_URL}", "{{base_url}}"];

struct Exchange {
    status: u16,
    headers: HeaderMap,
    body: Bytes,
    bytes_sent: u64,
    bytes_received: u64,
}

/// Marks a request between its start and its recorded outcome.
///
/// If the request future is dropped first (abort or graceful-stop expiry),
/// the request is still counted in `http_reqs` and as failed with
/// `error_code=cancelled`.
struct InFlight {
    sink: MetricSink,
    tags: Option<Tags>,
}

impl InFlight {
    fn new(sink: MetricSink, tags: &Tags) -> Self {
        Self {
            sink,
            tags: Some(tags.clone()),
        }
    }

    fn complete(mut self) {
        self.tags = None;
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let Some(mut tags) = self.tags.take() else {
            return;
        };
        tags.insert("status".to_owned(), "0".to_owned());
        tags.insert("expected_response".to_owned(), "false".to_owned());
        tags.insert("error_code".to_owned(), "cancelled".to_owned());
        let samples = [
            Sample::new(MetricKind::Counter, names::HTTP_REQS, 1.0, tags.clone()),
            Sample::rate(names::HTTP_REQ_FAILED, true, tags),
        ];
        if let Err(err) = self.sink.record_all(&samples) {
            debug!("Failed to record cancelled request: {}", err);
        }
    }
}

/// HTTP client owned by a single execution.
///
/// Connections are kept alive per origin and never shared with other
/// executions. Every call records its samples into the run's sink.
pub struct HttpClient {
    sink: MetricSink,
    options: Arc<ClientOptions>,
    tags: Tags,
    pool: HashMap<Origin, PooledConnection>,
    tls: Option<TlsConnector>,
}

impl HttpClient {
    /// Creates a client whose samples carry `tags` in addition to the
    /// per-request tags.
    #[must_use]
    pub fn new(sink: MetricSink, options: Arc<ClientOptions>, tags: Tags) -> Self {
        Self {
            sink,
            options,
            tags,
            pool: HashMap::new(),
            tls: None,
        }
    }

    pub async fn get(&mut self, url: &str, params: &RequestParams) -> Response {
        self.request(Method::GET, url, None, params).await
    }

    pub async fn post(&mut self, url: &str, body: Bytes, params: &RequestParams) -> Response {
        self.request(Method::POST, url, Some(body), params).await
    }

    /// Issues one request and records its samples.
    ///
    /// Suspends the calling execution until the response body is read or the
    /// timeout fires. Never fails: network errors come back as a status-0
    /// response carrying the error.
    pub async fn request(
        &mut self,
        method: Method,
        url: &str,
        body: Option<Bytes>,
        params: &RequestParams,
    ) -> Response {
        let target = self.resolve_url(url);
        let timeout = params.timeout.unwrap_or(self.options.timeout);
        let mut timings = Timings::default();

        let mut tags = self.tags.clone();
        tags.extend(params.tags.clone());
        tags.insert("method".to_owned(), method.as_str().to_owned());
        tags.insert(
            "name".to_owned(),
            params.name.clone().unwrap_or_else(|| target.clone()),
        );
        let in_flight = InFlight::new(self.sink.clone(), &tags);

        let outcome = match tokio::time::timeout(
            timeout,
            self.exchange(&method, &target, body.unwrap_or_default(), params, &mut timings),
        )
        .await
        {
            Ok(result) => result,
            Err(_elapsed) => Err(RequestError::Timeout {
                timeout_ms: timeout.as_millis(),
            }),
        };
        in_flight.complete();

        match outcome {
            Ok(exchange) => {
                let expected = self.options.expected_statuses.contains(&exchange.status);
                tags.insert("status".to_owned(), exchange.status.to_string());
                tags.insert("expected_response".to_owned(), expected.to_string());
                self.record(&timings, !expected, &tags, exchange.bytes_sent, exchange.bytes_received);
                Response::received(
                    target,
                    exchange.status,
                    exchange.headers,
                    exchange.body,
                    timings,
                )
            }
            Err(err) => {
                debug!("Request to {} failed: {}", target, err);
                tags.insert("status".to_owned(), "0".to_owned());
                tags.insert("expected_response".to_owned(), "false".to_owned());
                tags.insert("error_code".to_owned(), err.code().to_owned());
                // Pooled connection state is unknown after a failure.
                if let Some(origin) = Url::parse(&target)
                    .ok()
                    .and_then(|url| Origin::from_url(&url).ok())
                {
                    self.pool.remove(&origin);
                }
                self.record(&timings, true, &tags, 0, 0);
                Response::failed(target, err, timings)
            }
        }
    }

    /// Applies the base-target override to `url`.
    fn resolve_url(&self, url: &str) -> String {
        let Some(base) = self.options.base_url.as_deref() else {
            return url.to_owned();
        };
        let base = base.trim_end_matches('/');
        let mut resolved = url.to_owned();
        for placeholder in BASE_URL_PLACEHOLDERS {
            if resolved.contains(placeholder) {
                resolved = resolved.replace(placeholder, base);
            }
        }
        if resolved.starts_with('/') {
            return format!("{}{}", base, resolved);
        }
        resolved
    }

    async fn exchange(
        &mut self,
        method: &Method,
        target: &str,
        body: Bytes,
        params: &RequestParams,
        timings: &mut Timings,
    ) -> Result<Exchange, RequestError> {
        let url = Url::parse(target).map_err(|err| RequestError::InvalidUrl {
            url: target.to_owned(),
            source: err,
        })?;
        let origin = Origin::from_url(&url)?;
        let request = self.build_request(method, &url, &origin, body, params)?;
        let close_requested = request
            .headers()
            .get(CONNECTION)
            .is_some_and(|value| value.as_bytes().eq_ignore_ascii_case(b"close"));

        let mut connection = self.acquire(&origin, timings).await?;
        connection.reset_marks();

        let send_start = Instant::now();
        let sent = connection.sender.send_request(request).await;
        let head_at = Instant::now();
        let marks = connection.marks();
        let last_write = marks.last_write.unwrap_or(send_start).max(send_start);
        timings.sending = Some(last_write.saturating_duration_since(send_start));
        let response = sent.map_err(|err| RequestError::Protocol { source: err })?;

        let first_read = marks.first_read.unwrap_or(head_at).max(last_write);
        timings.waiting = Some(first_read.saturating_duration_since(last_write));

        let (parts, incoming) = response.into_parts();
        let body = incoming
            .collect()
            .await
            .map_err(|err| RequestError::Protocol { source: err })?
            .to_bytes();
        timings.receiving = Some(Instant::now().saturating_duration_since(first_read));

        let marks = connection.marks();
        let close_returned = parts
            .headers
            .get(CONNECTION)
            .is_some_and(|value| value.as_bytes().eq_ignore_ascii_case(b"close"));
        if !close_requested && !close_returned && !connection.sender.is_closed() {
            self.pool.insert(origin, connection);
        }

        Ok(Exchange {
            status: parts.status.as_u16(),
            headers: parts.headers,
            body,
            bytes_sent: marks.bytes_written,
            bytes_received: marks.bytes_read,
        })
    }

    /// Reuses a pooled connection or dials a new one, filling the blocked,
    /// connecting, and TLS phases.
    async fn acquire(
        &mut self,
        origin: &Origin,
        timings: &mut Timings,
    ) -> Result<PooledConnection, RequestError> {
        let blocked_start = Instant::now();
        if let Some(mut pooled) = self.pool.remove(origin)
            && !pooled.sender.is_closed()
            && pooled.sender.ready().await.is_ok()
        {
            timings.blocked = Some(blocked_start.elapsed());
            timings.connecting = Some(std::time::Duration::ZERO);
            timings.tls_handshaking = Some(std::time::Duration::ZERO);
            return Ok(pooled);
        }

        let addr = origin.resolve().await?;
        timings.blocked = Some(blocked_start.elapsed());

        let connect_start = Instant::now();
        let tcp = connect_tcp(addr, self.options.connect_timeout).await?;
        timings.connecting = Some(connect_start.elapsed());

        let stream = if origin.tls {
            let tls_start = Instant::now();
            let connector = self.tls_connector(&origin.host)?;
            let stream = tls_handshake(&connector, &origin.host, tcp).await?;
            timings.tls_handshaking = Some(tls_start.elapsed());
            stream
        } else {
            timings.tls_handshaking = Some(std::time::Duration::ZERO);
            MaybeTlsStream::Plain(tcp)
        };

        handshake(stream).await
    }

    fn tls_connector(&mut self, host: &str) -> Result<TlsConnector, RequestError> {
        if let Some(connector) = self.tls.as_ref() {
            return Ok(connector.clone());
        }
        let insecure = self.options.insecure_skip_tls_verify;
        let connector = tokio_native_tls::native_tls::TlsConnector::builder()
            .danger_accept_invalid_certs(insecure)
            .danger_accept_invalid_hostnames(insecure)
            .build()
            .map_err(|err| RequestError::Tls {
                host: host.to_owned(),
                source: err,
            })?;
        let connector = TlsConnector::from(connector);
        self.tls = Some(connector.clone());
        Ok(connector)
    }

    fn build_request(
        &self,
        method: &Method,
        url: &Url,
        origin: &Origin,
        body: Bytes,
        params: &RequestParams,
    ) -> Result<http::Request<Full<Bytes>>, RequestError> {
        let path = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_owned(),
        };
        let mut builder = http::Request::builder()
            .method(method.clone())
            .uri(path)
            .header(HOST, origin.authority.as_str());
        if let Some(agent) = self.options.user_agent.as_deref() {
            builder = builder.header(USER_AGENT, agent);
        }
        for (key, value) in self.options.headers.iter().chain(params.headers.iter()) {
            builder = builder.header(key.as_str(), value.as_str());
        }
        builder
            .body(Full::new(body))
            .map_err(|err| RequestError::BuildRequest { source: err })
    }

    fn record(&self, timings: &Timings, failed: bool, tags: &Tags, sent: u64, received: u64) {
        let mut samples = Vec::with_capacity(11);
        let phases = [
            (names::HTTP_REQ_BLOCKED, timings.blocked),
            (names::HTTP_REQ_CONNECTING, timings.connecting),
            (names::HTTP_REQ_TLS_HANDSHAKING, timings.tls_handshaking),
            (names::HTTP_REQ_SENDING, timings.sending),
            (names::HTTP_REQ_WAITING, timings.waiting),
            (names::HTTP_REQ_RECEIVING, timings.receiving),
        ];
        for (metric, phase) in phases {
            if let Some(duration) = phase {
                samples.push(Sample::new(
                    MetricKind::Trend,
                    metric,
                    as_millis_f64(duration),
                    tags.clone(),
                ));
            }
        }
        if timings.reached_server() {
            samples.push(Sample::new(
                MetricKind::Trend,
                names::HTTP_REQ_DURATION,
                as_millis_f64(timings.duration()),
                tags.clone(),
            ));
        }
        samples.push(Sample::new(MetricKind::Counter, names::HTTP_REQS, 1.0, tags.clone()));
        samples.push(Sample::rate(names::HTTP_REQ_FAILED, failed, tags.clone()));
        samples.push(Sample::new(
            MetricKind::Counter,
            names::DATA_SENT,
            sent as f64,
            tags.clone(),
        ));
        samples.push(Sample::new(
            MetricKind::Counter,
            names::DATA_RECEIVED,
            received as f64,
            tags.clone(),
        ));

        if let Err(err) = self.sink.record_all(&samples) {
            debug!("Failed to record HTTP samples: {}", err);
        }
    }
}
