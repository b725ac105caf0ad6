use std::future::Future;
use std::io;
use std::thread;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
#[cfg(unix)]
use tokio::net::UnixStream;
use tokio::runtime::Runtime;

use crate::endpoint::{Endpoint, Family, TimeoutSpec};
use crate::protocol::{ConfigError, TransportError, TransportErrorKind};
use crate::transport::{best_effort, Channel};

enum AsyncStream {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl AsyncStream {
    async fn read_some(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            AsyncStream::Tcp(s) => s.read(buf).await,
            #[cfg(unix)]
            AsyncStream::Unix(s) => s.read(buf).await,
        }
    }

    async fn write_some(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            AsyncStream::Tcp(s) => s.write(buf).await,
            #[cfg(unix)]
            AsyncStream::Unix(s) => s.write(buf).await,
        }
    }

    async fn flush(&mut self) -> io::Result<()> {
        match self {
            AsyncStream::Tcp(s) => s.flush().await,
            #[cfg(unix)]
            AsyncStream::Unix(s) => s.flush().await,
        }
    }

    async fn shutdown(&mut self) -> io::Result<()> {
        match self {
            AsyncStream::Tcp(s) => s.shutdown().await,
            #[cfg(unix)]
            AsyncStream::Unix(s) => s.shutdown().await,
        }
    }
}

/// Runs `fut` under `limit`, reporting expiry as `io::ErrorKind::TimedOut`.
/// A zero limit means no deadline.
async fn with_deadline<T, F>(limit: Duration, fut: F) -> io::Result<T>
where
    F: Future<Output = io::Result<T>>,
{
    if limit.is_zero() {
        return fut.await;
    }
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(io::Error::new(
            io::ErrorKind::TimedOut,
            format!("deadline of {}ms elapsed", limit.as_millis()),
        )),
    }
}

/// Event-loop socket transport.
///
/// Same contract as [`RawSocketTransport`](super::RawSocketTransport), but
/// the socket is driven by a private current-thread tokio runtime and every
/// read/write is bounded by the [`TimeoutSpec`] through `tokio::time::timeout`
/// instead of kernel socket options.
///
/// The calls still block the caller, so this transport must not be used from
/// inside another tokio runtime.
pub struct EventLoopTransport {
    endpoint: Endpoint,
    timeouts: TimeoutSpec,
    runtime: Option<Runtime>,
    stream: Option<AsyncStream>,
}

impl EventLoopTransport {
    /// Creates an unopened transport. The runtime is built on first `open`.
    pub fn new(endpoint: Endpoint, timeouts: TimeoutSpec) -> Result<Self, ConfigError> {
        endpoint.validate()?;
        Ok(Self {
            endpoint,
            timeouts,
            runtime: None,
            stream: None,
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

fn not_open(domain: String) -> TransportError {
    TransportError::new(TransportErrorKind::NotOpen, "Transport is not open", domain)
}

impl Channel for EventLoopTransport {
    fn open(&mut self) -> Result<(), TransportError> {
        if self.stream.is_some() {
            return Ok(());
        }

        let domain = self.endpoint.domain();
        if self.runtime.is_none() {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_io()
                .enable_time()
                .build()
                .map_err(|e| TransportError::from_io("Failed to start event loop", &domain, &e))?;
            self.runtime = Some(runtime);
        }
        let Some(runtime) = self.runtime.as_ref() else {
            return Err(not_open(domain));
        };

        let limit = self.timeouts.send;
        let stream = match self.endpoint.family {
            Family::Inet => {
                let host = self.endpoint.host.as_str();
                let port = self.endpoint.port;
                runtime
                    .block_on(with_deadline(limit, TcpStream::connect((host, port))))
                    .map(AsyncStream::Tcp)
            }
            #[cfg(unix)]
            Family::Unix => runtime
                .block_on(with_deadline(limit, UnixStream::connect(&self.endpoint.host)))
                .map(AsyncStream::Unix),
            #[cfg(not(unix))]
            Family::Unix => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "UNIX-domain sockets are not supported on this platform",
            )),
        }
        .map_err(|e| {
            TransportError::from_io("Failed to connect", &domain, &e)
                .with_kind(TransportErrorKind::NotOpen)
        })?;

        tracing::debug!(domain = %domain, "Event-loop socket opened");
        self.stream = Some(stream);
        Ok(())
    }

    fn close(&mut self) {
        let domain = self.endpoint.domain();
        if let (Some(runtime), Some(mut stream)) = (self.runtime.as_ref(), self.stream.take()) {
            best_effort("shutdown", &domain, || runtime.block_on(stream.shutdown()));
            tracing::debug!(domain = %domain, "Event-loop socket closed");
        }
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    fn read(&mut self, len: usize) -> Result<Vec<u8>, TransportError> {
        let domain = self.endpoint.domain();
        let limit = self.timeouts.recv;
        let (Some(runtime), Some(stream)) = (self.runtime.as_ref(), self.stream.as_mut()) else {
            return Err(not_open(domain));
        };

        let mut buf = vec![0u8; len];
        let mut filled = 0;
        while filled < len {
            let result = runtime.block_on(with_deadline(limit, stream.read_some(&mut buf[filled..])));
            match result {
                Ok(0) => {
                    return Err(TransportError::connection_reset(
                        format!("Peer closed connection after {} of {} bytes", filled, len),
                        domain,
                    ));
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                    thread::sleep(Duration::from_micros(1));
                }
                Err(e) => return Err(TransportError::from_io("Failed to read from socket", &domain, &e)),
            }
        }

        Ok(buf)
    }

    fn write(&mut self, buf: &[u8]) -> Result<(), TransportError> {
        let domain = self.endpoint.domain();
        let limit = self.timeouts.send;
        let (Some(runtime), Some(stream)) = (self.runtime.as_ref(), self.stream.as_mut()) else {
            return Err(not_open(domain));
        };

        let mut written = 0;
        while written < buf.len() {
            match runtime.block_on(with_deadline(limit, stream.write_some(&buf[written..]))) {
                Ok(0) => {
                    return Err(TransportError::connection_reset(
                        format!("Socket accepted no bytes after {} of {}", written, buf.len()),
                        domain,
                    ));
                }
                Ok(n) => written += n,
                Err(e) => return Err(TransportError::from_io("Failed to write to socket", &domain, &e)),
            }
        }

        Ok(())
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        let domain = self.endpoint.domain();
        let limit = self.timeouts.send;
        let (Some(runtime), Some(stream)) = (self.runtime.as_ref(), self.stream.as_mut()) else {
            return Err(not_open(domain));
        };
        runtime
            .block_on(with_deadline(limit, stream.flush()))
            .map_err(|e| TransportError::from_io("Failed to flush socket", &domain, &e))
    }

    fn domain(&self) -> String {
        self.endpoint.domain()
    }
}

impl Drop for EventLoopTransport {
    fn drop(&mut self) {
        self.close();
    }
}
