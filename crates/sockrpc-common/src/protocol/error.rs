//! sockrpc Error Types
//!
//! Three failure classes flow through the stack:
//!
//! - [`ConfigError`]: invalid or missing endpoint/module configuration. Raised
//!   before any socket is touched and never retried.
//! - [`TransportError`]: connect, read, write or frame-fetch failure. Always
//!   carries an OS-style error code (when one exists) and the endpoint domain.
//!   The invoker retries these after reconnecting.
//! - [`CallError`]: the transport worked but the call did not: the remote
//!   method did not resolve or the response was empty/unparsable. Never retried.
//!
//! [`SockrpcError`] wraps all three so callers can use a single `Result`.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Classification of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The connection could not be established or is not open.
    NotOpen,
    /// A socket-level send/receive timeout expired.
    TimedOut,
    /// The peer closed or reset the connection (including zero-byte reads).
    ConnectionReset,
    /// An inbound frame announced a length above the frame limit.
    FrameTooLarge,
    /// Any other I/O failure.
    Unknown,
}

impl TransportErrorKind {
    /// Maps an `io::ErrorKind` onto the transport taxonomy.
    pub fn classify(kind: io::ErrorKind) -> Self {
        match kind {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TransportErrorKind::TimedOut,
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof
            | io::ErrorKind::WriteZero => TransportErrorKind::ConnectionReset,
            io::ErrorKind::NotConnected | io::ErrorKind::ConnectionRefused => {
                TransportErrorKind::NotOpen
            }
            _ => TransportErrorKind::Unknown,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            TransportErrorKind::NotOpen => "transport not open",
            TransportErrorKind::TimedOut => "operation timed out",
            TransportErrorKind::ConnectionReset => "connection reset by peer",
            TransportErrorKind::FrameTooLarge => "frame exceeds maximum size",
            TransportErrorKind::Unknown => "unknown transport failure",
        }
    }
}

/// A uniform transport failure.
///
/// The rendered message has the shape `"{message} ({domain}): {reason}"`, where
/// `reason` is the OS error text when an OS code is known.
#[derive(Error, Debug)]
#[error("{message} ({domain}): {reason}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    /// OS error number (`errno`), when the failure came from the kernel.
    pub code: Option<i32>,
    pub message: String,
    /// `host:port` for INET endpoints, the socket path for UNIX endpoints.
    pub domain: String,
    pub reason: String,
}

impl TransportError {
    pub fn new(
        kind: TransportErrorKind,
        message: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        TransportError {
            kind,
            code: None,
            message: message.into(),
            domain: domain.into(),
            reason: kind.describe().to_string(),
        }
    }

    /// Builds an error from an `io::Error`, keeping its OS code and text.
    pub fn from_io(message: impl Into<String>, domain: impl Into<String>, err: &io::Error) -> Self {
        TransportError {
            kind: TransportErrorKind::classify(err.kind()),
            code: err.raw_os_error(),
            message: message.into(),
            domain: domain.into(),
            reason: err.to_string(),
        }
    }

    /// Builds an error for a known OS error number.
    pub fn from_code(
        kind: TransportErrorKind,
        code: i32,
        message: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        TransportError {
            kind,
            code: Some(code),
            message: message.into(),
            domain: domain.into(),
            reason: io::Error::from_raw_os_error(code).to_string(),
        }
    }

    /// The peer closed the connection (a read returned zero bytes).
    pub fn connection_reset(message: impl Into<String>, domain: impl Into<String>) -> Self {
        Self::from_code(
            TransportErrorKind::ConnectionReset,
            libc::ECONNRESET,
            message,
            domain,
        )
    }

    /// Overrides the classification, keeping code and reason.
    pub fn with_kind(mut self, kind: TransportErrorKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn is_connection_reset(&self) -> bool {
        self.kind == TransportErrorKind::ConnectionReset
    }
}

/// Invalid or missing configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No configuration for module '{0}'")]
    MissingModule(String),

    #[error("Module '{module}' is missing required field '{field}'")]
    MissingField { module: String, field: &'static str },

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A call that reached the peer but cannot be completed by reconnecting.
#[derive(Error, Debug)]
pub enum CallError {
    #[error("Empty response payload")]
    EmptyResponse,

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Failed to encode request: {0}")]
    Encode(String),
}

#[derive(Error, Debug)]
pub enum SockrpcError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Call error: {0}")]
    Call(#[from] CallError),
}

impl SockrpcError {
    /// Only transport failures can be fixed by reconnecting.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SockrpcError::Transport(_))
    }

    pub fn as_transport(&self) -> Option<&TransportError> {
        match self {
            SockrpcError::Transport(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SockrpcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_io_kinds() {
        assert_eq!(
            TransportErrorKind::classify(io::ErrorKind::WouldBlock),
            TransportErrorKind::TimedOut
        );
        assert_eq!(
            TransportErrorKind::classify(io::ErrorKind::BrokenPipe),
            TransportErrorKind::ConnectionReset
        );
        assert_eq!(
            TransportErrorKind::classify(io::ErrorKind::ConnectionRefused),
            TransportErrorKind::NotOpen
        );
        assert_eq!(
            TransportErrorKind::classify(io::ErrorKind::InvalidData),
            TransportErrorKind::Unknown
        );
    }

    #[test]
    fn test_connection_reset_carries_errno() {
        let err = TransportError::connection_reset("peer closed", "127.0.0.1:9090");
        assert!(err.is_connection_reset());
        assert_eq!(err.code, Some(libc::ECONNRESET));
        let text = err.to_string();
        assert!(text.starts_with("peer closed (127.0.0.1:9090): "));
    }

    #[test]
    fn test_from_io_keeps_os_code() {
        let io_err = io::Error::from_raw_os_error(libc::ECONNREFUSED);
        let err = TransportError::from_io("connect failed", "localhost:9090", &io_err);
        assert_eq!(err.kind, TransportErrorKind::NotOpen);
        assert_eq!(err.code, Some(libc::ECONNREFUSED));
        assert!(err.to_string().contains("localhost:9090"));
    }

    #[test]
    fn test_only_transport_is_retryable() {
        let transport: SockrpcError =
            TransportError::new(TransportErrorKind::Unknown, "x", "d").into();
        let call: SockrpcError = CallError::EmptyResponse.into();
        let config: SockrpcError = ConfigError::MissingModule("m".into()).into();

        assert!(transport.is_retryable());
        assert!(!call.is_retryable());
        assert!(!config.is_retryable());
    }
}
