use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
#[cfg(unix)]
use std::os::unix::net::UnixStream;
use std::thread;
use std::time::Duration;

use crate::endpoint::{Endpoint, Family, TimeoutSpec};
use crate::protocol::{ConfigError, TransportError, TransportErrorKind};
use crate::transport::{best_effort, Channel};

/// Pause before re-issuing a syscall interrupted by a signal.
const EINTR_RETRY_DELAY: Duration = Duration::from_micros(1);

enum Stream {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl Stream {
    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        match self {
            Stream::Tcp(s) => s.set_read_timeout(timeout),
            #[cfg(unix)]
            Stream::Unix(s) => s.set_read_timeout(timeout),
        }
    }

    fn set_write_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        match self {
            Stream::Tcp(s) => s.set_write_timeout(timeout),
            #[cfg(unix)]
            Stream::Unix(s) => s.set_write_timeout(timeout),
        }
    }

    fn shutdown(&self) -> io::Result<()> {
        match self {
            Stream::Tcp(s) => s.shutdown(Shutdown::Both),
            #[cfg(unix)]
            Stream::Unix(s) => s.shutdown(Shutdown::Both),
        }
    }
}

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Stream::Tcp(s) => s.read(buf),
            #[cfg(unix)]
            Stream::Unix(s) => s.read(buf),
        }
    }
}

impl Write for Stream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Stream::Tcp(s) => s.write(buf),
            #[cfg(unix)]
            Stream::Unix(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Stream::Tcp(s) => s.flush(),
            #[cfg(unix)]
            Stream::Unix(s) => s.flush(),
        }
    }
}

/// Blocking socket transport (TCP or UNIX-domain).
///
/// Reads and writes loop directly over the kernel socket until the requested
/// byte count is satisfied. Send/receive timeouts are socket options, so an
/// expired timeout makes the blocking syscall itself fail.
///
/// The endpoint is validated when the transport is built, so `open` never
/// issues a syscall for an endpoint that cannot work.
///
/// # Example
///
/// ```no_run
/// use sockrpc_common::endpoint::{Endpoint, TimeoutSpec};
/// use sockrpc_common::transport::{Channel, RawSocketTransport};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut transport = RawSocketTransport::new(
///     Endpoint::inet("127.0.0.1", 9090),
///     TimeoutSpec::from_millis(1_000, 5_000),
/// )?;
/// transport.open()?;
/// transport.write(b"ping")?;
/// let reply = transport.read(4)?;
/// transport.close();
/// # Ok(())
/// # }
/// ```
pub struct RawSocketTransport {
    endpoint: Endpoint,
    timeouts: TimeoutSpec,
    stream: Option<Stream>,
}

impl RawSocketTransport {
    /// Creates an unopened transport.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEndpoint` if the host/port are not valid
    /// for the endpoint's family.
    pub fn new(endpoint: Endpoint, timeouts: TimeoutSpec) -> Result<Self, ConfigError> {
        endpoint.validate()?;
        Ok(Self {
            endpoint,
            timeouts,
            stream: None,
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn timeouts(&self) -> TimeoutSpec {
        self.timeouts
    }

    fn connect(&self) -> Result<Stream, TransportError> {
        let domain = self.endpoint.domain();
        match self.endpoint.family {
            Family::Inet => {
                let addrs = (self.endpoint.host.as_str(), self.endpoint.port)
                    .to_socket_addrs()
                    .map_err(|e| error("Failed to resolve address", &domain, &e))?;

                // Try each resolved address until one succeeds
                let mut last_err = None;
                for addr in addrs {
                    let attempt = if self.timeouts.send.is_zero() {
                        TcpStream::connect(addr)
                    } else {
                        TcpStream::connect_timeout(&addr, self.timeouts.send)
                    };
                    match attempt {
                        Ok(stream) => return Ok(Stream::Tcp(stream)),
                        Err(e) => last_err = Some(e),
                    }
                }

                Err(match last_err {
                    Some(e) => error("Failed to connect", &domain, &e)
                        .with_kind(TransportErrorKind::NotOpen),
                    None => TransportError::new(
                        TransportErrorKind::NotOpen,
                        "Address resolved to nothing",
                        domain,
                    ),
                })
            }
            #[cfg(unix)]
            Family::Unix => UnixStream::connect(&self.endpoint.host)
                .map(Stream::Unix)
                .map_err(|e| {
                    error("Failed to connect", &domain, &e).with_kind(TransportErrorKind::NotOpen)
                }),
            #[cfg(not(unix))]
            Family::Unix => Err(TransportError::new(
                TransportErrorKind::NotOpen,
                "UNIX-domain sockets are not supported on this platform",
                domain,
            )),
        }
    }

    /// Applies the timeout spec as socket options. Failure leaves the OS
    /// default in place.
    fn apply_timeouts(&self, stream: &Stream) {
        let domain = self.endpoint.domain();
        let recv = socket_timeout(self.timeouts.recv);
        let send = socket_timeout(self.timeouts.send);

        if let Err(e) = stream.set_read_timeout(recv) {
            tracing::warn!(domain = %domain, error = %e, "Failed to set receive timeout");
        }
        if let Err(e) = stream.set_write_timeout(send) {
            tracing::warn!(domain = %domain, error = %e, "Failed to set send timeout");
        }
    }

    fn stream_mut(&mut self) -> Result<&mut Stream, TransportError> {
        let domain = &self.endpoint;
        self.stream.as_mut().ok_or_else(|| {
            TransportError::new(
                TransportErrorKind::NotOpen,
                "Transport is not open",
                domain.domain(),
            )
        })
    }
}

/// Converts a timeout into the option value the socket accepts. Zero means
/// "no timeout", which the socket API expresses as `None`.
fn socket_timeout(timeout: Duration) -> Option<Duration> {
    if timeout.is_zero() {
        return None;
    }
    // Sub-millisecond values round up; truncating them would disable the timeout
    let timeout = timeout.max(Duration::from_millis(1));
    Some(TimeoutSpec::from_timeval(TimeoutSpec::as_timeval(timeout)))
}

/// Single funnel for every failure path of this backend.
fn error(msg: &str, domain: &str, err: &io::Error) -> TransportError {
    TransportError::from_io(msg, domain, err)
}

impl Channel for RawSocketTransport {
    fn open(&mut self) -> Result<(), TransportError> {
        if self.stream.is_some() {
            return Ok(());
        }

        let stream = self.connect()?;
        self.apply_timeouts(&stream);
        tracing::debug!(domain = %self.endpoint, "Socket opened");
        self.stream = Some(stream);
        Ok(())
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            best_effort("shutdown", &self.endpoint.domain(), || stream.shutdown());
            tracing::debug!(domain = %self.endpoint, "Socket closed");
        }
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    fn read(&mut self, len: usize) -> Result<Vec<u8>, TransportError> {
        let domain = self.endpoint.domain();
        let stream = self.stream_mut()?;

        let mut buf = vec![0u8; len];
        let mut filled = 0;
        while filled < len {
            match stream.read(&mut buf[filled..]) {
                Ok(0) => {
                    return Err(TransportError::connection_reset(
                        format!("Peer closed connection after {} of {} bytes", filled, len),
                        domain,
                    ));
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                    thread::sleep(EINTR_RETRY_DELAY);
                }
                Err(e) => return Err(error("Failed to read from socket", &domain, &e)),
            }
        }

        Ok(buf)
    }

    fn write(&mut self, buf: &[u8]) -> Result<(), TransportError> {
        let domain = self.endpoint.domain();
        let stream = self.stream_mut()?;

        let mut written = 0;
        while written < buf.len() {
            match stream.write(&buf[written..]) {
                Ok(0) => {
                    return Err(TransportError::connection_reset(
                        format!("Socket accepted no bytes after {} of {}", written, buf.len()),
                        domain,
                    ));
                }
                Ok(n) => written += n,
                Err(e) => return Err(error("Failed to write to socket", &domain, &e)),
            }
        }

        Ok(())
    }

    /// No-op: every `write` goes straight to the socket.
    fn flush(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    fn domain(&self) -> String {
        self.endpoint.domain()
    }
}

impl Drop for RawSocketTransport {
    fn drop(&mut self) {
        self.close();
    }
}
