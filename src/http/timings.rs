use std::time::Duration;

use serde::Serialize;

/// Phase breakdown of one request. A phase is `None` when the request never
/// reached it (or, for connect/TLS, when a pooled connection was reused).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Timings {
    pub blocked: Option<Duration>,
    pub connecting: Option<Duration>,
    pub tls_handshaking: Option<Duration>,
    pub sending: Option<Duration>,
    pub waiting: Option<Duration>,
    pub receiving: Option<Duration>,
}

impl Timings {
    /// Time on the wire: sending + waiting + receiving.
    #[must_use]
    pub fn duration(&self) -> Duration {
        [self.sending, self.waiting, self.receiving]
            .into_iter()
            .flatten()
            .fold(Duration::ZERO, Duration::saturating_add)
    }

    #[must_use]
    pub const fn reached_server(&self) -> bool {
        self.sending.is_some()
    }
}

pub(crate) fn as_millis_f64(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}
