use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use http_body_util::Full;
use hyper::client::conn::http1::{self, SendRequest};
use hyper_util::rt::TokioIo;
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio::time::Instant;
use tokio_native_tls::{TlsConnector, TlsStream};
use tracing::debug;
use url::{Host, Url};

use crate::error::RequestError;

/// Scheme, host, and port of a request target; the connection pool key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(super) struct Origin {
    pub(super) tls: bool,
    pub(super) host: String,
    pub(super) port: u16,
    /// `Host` header value.
    pub(super) authority: String,
}

impl Origin {
    pub(super) fn from_url(url: &Url) -> Result<Self, RequestError> {
        let tls = match url.scheme() {
            "http" => false,
            "https" => true,
            other => {
                return Err(RequestError::UnsupportedScheme {
                    url: url.to_string(),
                    scheme: other.to_owned(),
                });
            }
        };
        let host = match url.host() {
            Some(Host::Domain(domain)) => domain.to_owned(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            None => {
                return Err(RequestError::MissingHost {
                    url: url.to_string(),
                });
            }
        };
        let port = url
            .port_or_known_default()
            .unwrap_or(if tls { 443 } else { 80 });
        let host_str = url.host_str().unwrap_or(&host);
        let authority = match url.port() {
            Some(port) => format!("{}:{}", host_str, port),
            None => host_str.to_owned(),
        };
        Ok(Self {
            tls,
            host,
            port,
            authority,
        })
    }

    pub(super) async fn resolve(&self) -> Result<SocketAddr, RequestError> {
        let mut addrs = tokio::net::lookup_host((self.host.as_str(), self.port))
            .await
            .map_err(|err| RequestError::Dns {
                host: self.host.clone(),
                source: err,
            })?;
        addrs.next().ok_or_else(|| RequestError::NoAddresses {
            host: self.host.clone(),
        })
    }
}

/// Write/read instants observed on a connection during one exchange.
#[derive(Debug, Default, Clone, Copy)]
pub(super) struct IoMarks {
    pub(super) last_write: Option<Instant>,
    pub(super) first_read: Option<Instant>,
    pub(super) bytes_written: u64,
    pub(super) bytes_read: u64,
}

pub(super) type SharedMarks = Arc<Mutex<IoMarks>>;

/// Stream wrapper that stamps [`IoMarks`] as bytes move.
pub(super) struct TimedIo<S> {
    inner: S,
    marks: SharedMarks,
}

impl<S> AsyncRead for TimedIo<S>
where
    S: AsyncRead + Unpin,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        let poll = Pin::new(&mut this.inner).poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = &poll {
            let read = buf.filled().len().saturating_sub(before);
            if read > 0 {
                let mut marks = this.marks.lock();
                if marks.first_read.is_none() {
                    marks.first_read = Some(Instant::now());
                }
                marks.bytes_read = marks.bytes_read.saturating_add(read as u64);
            }
        }
        poll
    }
}

impl<S> AsyncWrite for TimedIo<S>
where
    S: AsyncWrite + Unpin,
{
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let poll = Pin::new(&mut this.inner).poll_write(cx, buf);
        if let Poll::Ready(Ok(written)) = &poll
            && *written > 0
        {
            let mut marks = this.marks.lock();
            marks.last_write = Some(Instant::now());
            marks.bytes_written = marks.bytes_written.saturating_add(*written as u64);
        }
        poll
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

pub(super) enum MaybeTlsStream {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl AsyncRead for MaybeTlsStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(stream) => Pin::new(stream).poll_read(cx, buf),
            MaybeTlsStream::Tls(stream) => Pin::new(stream.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for MaybeTlsStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(stream) => Pin::new(stream).poll_write(cx, buf),
            MaybeTlsStream::Tls(stream) => Pin::new(stream.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(stream) => Pin::new(stream).poll_flush(cx),
            MaybeTlsStream::Tls(stream) => Pin::new(stream.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(stream) => Pin::new(stream).poll_shutdown(cx),
            MaybeTlsStream::Tls(stream) => Pin::new(stream.as_mut()).poll_shutdown(cx),
        }
    }
}

/// An established HTTP/1.1 connection owned by one client.
pub(super) struct PooledConnection {
    pub(super) sender: SendRequest<Full<Bytes>>,
    pub(super) marks: SharedMarks,
}

impl PooledConnection {
    pub(super) fn reset_marks(&self) {
        *self.marks.lock() = IoMarks::default();
    }

    pub(super) fn marks(&self) -> IoMarks {
        *self.marks.lock()
    }
}

pub(super) async fn connect_tcp(
    addr: SocketAddr,
    connect_timeout: Duration,
) -> Result<TcpStream, RequestError> {
    let stream = tokio::time::timeout(connect_timeout, TcpStream::connect(addr))
        .await
        .map_err(|_elapsed| RequestError::ConnectTimeout {
            addr: addr.to_string(),
        })?
        .map_err(|err| RequestError::Connect {
            addr: addr.to_string(),
            source: err,
        })?;
    if let Err(err) = stream.set_nodelay(true) {
        debug!("Failed to set TCP_NODELAY on {}: {}", addr, err);
    }
    Ok(stream)
}

pub(super) async fn tls_handshake(
    connector: &TlsConnector,
    host: &str,
    stream: TcpStream,
) -> Result<MaybeTlsStream, RequestError> {
    let stream = connector
        .connect(host, stream)
        .await
        .map_err(|err| RequestError::Tls {
            host: host.to_owned(),
            source: err,
        })?;
    Ok(MaybeTlsStream::Tls(Box::new(stream)))
}

/// Performs the HTTP/1.1 handshake and spawns the connection driver.
pub(super) async fn handshake(stream: MaybeTlsStream) -> Result<PooledConnection, RequestError> {
    let marks = SharedMarks::default();
    let io = TokioIo::new(TimedIo {
        inner: stream,
        marks: Arc::clone(&marks),
    });
    let (sender, connection) = http1::handshake(io)
        .await
        .map_err(|err| RequestError::Protocol { source: err })?;
    tokio::spawn(async move {
        if let Err(err) = connection.await {
            debug!("HTTP connection closed with error: {}", err);
        }
    });
    Ok(PooledConnection { sender, marks })
}
