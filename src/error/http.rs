use thiserror::Error;

/// Failure of a single HTTP exchange.
///
/// Network-level variants never propagate out of the client: they are folded
/// into the `Response` and the `http_req_failed` rate. Body decoding variants
/// surface where the caller accesses the body.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Unsupported URL scheme '{scheme}' in '{url}'.")]
    UnsupportedScheme { url: String, scheme: String },
    #[error("URL '{url}' has no host.")]
    MissingHost { url: String },
    #[error("Failed to resolve '{host}': {source}")]
    Dns {
        host: String,
        #[source]
        source: std::io::Error,
    },
    #[error("No addresses resolved for '{host}'.")]
    NoAddresses { host: String },
    #[error("Failed to connect to '{addr}': {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Connecting to '{addr}' timed out.")]
    ConnectTimeout { addr: String },
    #[error("TLS handshake with '{host}' failed: {source}")]
    Tls {
        host: String,
        #[source]
        source: tokio_native_tls::native_tls::Error,
    },
    #[error("Failed to build request: {source}")]
    BuildRequest {
        #[source]
        source: http::Error,
    },
    #[error("HTTP protocol error: {source}")]
    Protocol {
        #[source]
        source: hyper::Error,
    },
    #[error("Request timed out after {timeout_ms}ms.")]
    Timeout { timeout_ms: u128 },
    #[error("Response body is not valid UTF-8: {source}")]
    BodyUtf8 {
        #[source]
        source: std::str::Utf8Error,
    },
    #[error("Response body is not valid JSON: {source}")]
    BodyJson {
        #[source]
        source: serde_json::Error,
    },
    #[error("No request was made (status 0) and no body is available.")]
    NoBody,
}

impl RequestError {
    /// Short machine-friendly code used as the `error` tag on failed requests.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            RequestError::InvalidUrl { .. }
            | RequestError::UnsupportedScheme { .. }
            | RequestError::MissingHost { .. }
            | RequestError::BuildRequest { .. } => "invalid_request",
            RequestError::Dns { .. } | RequestError::NoAddresses { .. } => "dns",
            RequestError::Connect { .. } => "connect",
            RequestError::ConnectTimeout { .. } | RequestError::Timeout { .. } => "timeout",
            RequestError::Tls { .. } => "tls",
            RequestError::Protocol { .. } => "protocol",
            RequestError::BodyUtf8 { .. } | RequestError::BodyJson { .. } | RequestError::NoBody => {
                "body"
            }
        }
    }
}
