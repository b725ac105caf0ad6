//! sockrpc Transport Layer
//!
//! This module turns a stream socket into discrete application messages.
//!
//! # Architecture
//!
//! - **[`Channel`]**: the duplex byte-channel capability set every backend
//!   implements (`open`/`close`/`is_open`/`read`/`write`/`flush`).
//! - **[`RawSocketTransport`]**: blocking backend issuing reads and writes
//!   directly against a TCP or UNIX-domain socket.
//! - **[`EventLoopTransport`]**: the same contract driven by a private tokio
//!   event loop.
//! - **[`FramedTransport`]**: wraps any channel and adds message framing.
//! - **[`Codec`]** / **[`JsonCodec`]**: request/response payload encoding.
//!
//! # Wire Format
//!
//! ```text
//! [4-byte big-endian unsigned length] [length bytes of payload]
//! ```
//!
//! # Example
//!
//! ```no_run
//! use sockrpc_common::endpoint::{Endpoint, TimeoutSpec};
//! use sockrpc_common::transport::{Channel, FramedTransport, RawSocketTransport};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let socket = RawSocketTransport::new(Endpoint::inet("127.0.0.1", 9090), TimeoutSpec::default())?;
//! let mut framed = FramedTransport::new(socket);
//! framed.open()?;
//! framed.write(br#"{"id":"1","method":"ping","args":[]}"#)?;
//! framed.flush()?;
//! let reply = framed.read_frame()?;
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod event_loop;
pub mod framed;
pub mod socket;

pub use codec::{Codec, JsonCodec};
pub use event_loop::EventLoopTransport;
pub use framed::{FramedTransport, MAX_FRAME_SIZE};
pub use socket::RawSocketTransport;

use std::io;

use serde::{Deserialize, Serialize};

use crate::endpoint::{Endpoint, TimeoutSpec};
use crate::protocol::{ConfigError, TransportError};

/// Duplex byte channel consumed by [`FramedTransport`].
///
/// Implementations own their connection exclusively and assume
/// non-overlapping use: one call at a time.
pub trait Channel {
    /// Opens the connection. A no-op when already open.
    fn open(&mut self) -> Result<(), TransportError>;

    /// Best-effort shutdown and close. Safe to call repeatedly.
    fn close(&mut self);

    /// Local check, no syscall.
    fn is_open(&self) -> bool;

    /// Reads exactly `len` bytes or fails.
    fn read(&mut self, len: usize) -> Result<Vec<u8>, TransportError>;

    /// Writes the whole buffer or fails.
    fn write(&mut self, buf: &[u8]) -> Result<(), TransportError>;

    fn flush(&mut self) -> Result<(), TransportError>;

    /// Drops any existing connection and opens a fresh one.
    fn reconnect(&mut self) -> Result<(), TransportError> {
        self.close();
        self.open()
    }

    /// `host:port` or socket path, used to tag errors and log records.
    fn domain(&self) -> String;
}

impl<C: Channel + ?Sized> Channel for Box<C> {
    fn open(&mut self) -> Result<(), TransportError> {
        (**self).open()
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn read(&mut self, len: usize) -> Result<Vec<u8>, TransportError> {
        (**self).read(len)
    }

    fn write(&mut self, buf: &[u8]) -> Result<(), TransportError> {
        (**self).write(buf)
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        (**self).flush()
    }

    fn reconnect(&mut self) -> Result<(), TransportError> {
        (**self).reconnect()
    }

    fn domain(&self) -> String {
        (**self).domain()
    }
}

/// Which socket backend carries the bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// [`RawSocketTransport`]
    #[default]
    Blocking,
    /// [`EventLoopTransport`]
    EventLoop,
}

/// Builds an unopened channel for `endpoint` on the selected backend.
pub fn channel_for(
    endpoint: Endpoint,
    timeouts: TimeoutSpec,
    backend: Backend,
) -> Result<Box<dyn Channel + Send>, ConfigError> {
    Ok(match backend {
        Backend::Blocking => Box::new(RawSocketTransport::new(endpoint, timeouts)?),
        Backend::EventLoop => Box::new(EventLoopTransport::new(endpoint, timeouts)?),
    })
}

/// Runs a shutdown/close step whose failure cannot be acted upon.
///
/// Errors meaning the socket is already gone are discarded; anything else is
/// logged and then discarded as well.
pub fn best_effort<F>(op: &str, domain: &str, f: F)
where
    F: FnOnce() -> io::Result<()>,
{
    if let Err(e) = f() {
        match e.kind() {
            io::ErrorKind::NotConnected
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted => {}
            _ => tracing::warn!(domain, error = %e, "best-effort {} failed", op),
        }
    }
}
