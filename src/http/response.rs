use bytes::Bytes;
use http::HeaderMap;
use serde::de::DeserializeOwned;

use crate::error::RequestError;

use super::Timings;

/// Result of one request as seen by the iteration.
///
/// Network failures do not surface as `Err`: the response has status 0 and
/// carries the error. The body is decoded only when accessed.
#[derive(Debug)]
pub struct Response {
    url: String,
    status: u16,
    headers: HeaderMap,
    body: Bytes,
    timings: Timings,
    error: Option<RequestError>,
}

impl Response {
    pub(crate) const fn received(
        url: String,
        status: u16,
        headers: HeaderMap,
        body: Bytes,
        timings: Timings,
    ) -> Self {
        Self {
            url,
            status,
            headers,
            body,
            timings,
            error: None,
        }
    }

    pub(crate) fn failed(url: String, error: RequestError, timings: Timings) -> Self {
        Self {
            url,
            status: 0,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            timings,
            error: Some(error),
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// HTTP status, or 0 when no response was received.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .and_then(|value| value.to_str().ok())
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    #[must_use]
    pub const fn timings(&self) -> &Timings {
        &self.timings
    }

    /// Network-level failure, if the exchange did not complete.
    #[must_use]
    pub const fn error(&self) -> Option<&RequestError> {
        self.error.as_ref()
    }

    /// Body as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns an error when no response was received or the body is not
    /// valid UTF-8.
    pub fn text(&self) -> Result<&str, RequestError> {
        self.ensure_received()?;
        std::str::from_utf8(&self.body).map_err(|err| RequestError::BodyUtf8 { source: err })
    }

    /// Decodes the body as JSON into `T`.
    ///
    /// # Errors
    ///
    /// Returns an error when no response was received or the body does not
    /// decode into `T`.
    pub fn json<T>(&self) -> Result<T, RequestError>
    where
        T: DeserializeOwned,
    {
        self.ensure_received()?;
        serde_json::from_slice(&self.body).map_err(|err| RequestError::BodyJson { source: err })
    }

    /// Decodes the body and returns the value at a JSON pointer (`/a/0/b`).
    ///
    /// # Errors
    ///
    /// Returns an error when the body is not JSON.
    pub fn json_pointer(&self, pointer: &str) -> Result<Option<serde_json::Value>, RequestError> {
        let mut value: serde_json::Value = self.json()?;
        Ok(value.pointer_mut(pointer).map(serde_json::Value::take))
    }

    fn ensure_received(&self) -> Result<(), RequestError> {
        if self.status == 0 {
            return Err(RequestError::NoBody);
        }
        Ok(())
    }
}
