//! Endpoints and socket timeouts.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::protocol::ConfigError;

/// Default send timeout, shared by every layer.
pub const DEFAULT_SEND_TIMEOUT_MS: u64 = 10_000;
/// Default receive timeout, shared by every layer.
pub const DEFAULT_RECV_TIMEOUT_MS: u64 = 20_000;

/// Socket address family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    #[default]
    Inet,
    Unix,
}

/// Where a transport connects to.
///
/// For [`Family::Unix`] the host is a filesystem path and the port is always 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub family: Family,
}

impl Endpoint {
    pub fn inet(host: impl Into<String>, port: u16) -> Self {
        Endpoint {
            host: host.into(),
            port,
            family: Family::Inet,
        }
    }

    pub fn unix(path: impl Into<String>) -> Self {
        Endpoint {
            host: path.into(),
            port: 0,
            family: Family::Unix,
        }
    }

    /// Builds an endpoint for `family`, forcing the port to 0 for UNIX sockets.
    pub fn new(host: impl Into<String>, port: u16, family: Family) -> Self {
        match family {
            Family::Inet => Self::inet(host, port),
            Family::Unix => Self::unix(host),
        }
    }

    /// Checks the endpoint can be opened without attempting any syscall.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::InvalidEndpoint(match self.family {
                Family::Inet => "host must not be empty".to_string(),
                Family::Unix => "socket path must not be empty".to_string(),
            }));
        }
        match self.family {
            Family::Inet if self.port == 0 => Err(ConfigError::InvalidEndpoint(format!(
                "port must be greater than 0 for {}",
                self.host
            ))),
            Family::Unix if self.port != 0 => Err(ConfigError::InvalidEndpoint(format!(
                "unix socket {} must not carry a port",
                self.host
            ))),
            _ => Ok(()),
        }
    }

    /// `host:port` for INET endpoints, the socket path for UNIX ones.
    pub fn domain(&self) -> String {
        match self.family {
            Family::Inet => format!("{}:{}", self.host, self.port),
            Family::Unix => self.host.clone(),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.domain())
    }
}

/// Send/receive timeouts applied as socket options at open time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutSpec {
    pub send: Duration,
    pub recv: Duration,
}

impl TimeoutSpec {
    pub fn from_millis(send_ms: u64, recv_ms: u64) -> Self {
        TimeoutSpec {
            send: Duration::from_millis(send_ms),
            recv: Duration::from_millis(recv_ms),
        }
    }

    /// Splits a timeout into whole seconds and the remaining microseconds,
    /// the shape the kernel's `SO_SNDTIMEO`/`SO_RCVTIMEO` options take.
    pub fn as_timeval(timeout: Duration) -> (u64, u32) {
        let millis = timeout.as_millis() as u64;
        (millis / 1000, ((millis % 1000) * 1000) as u32)
    }

    /// Rebuilds a `Duration` from a `(seconds, microseconds)` pair.
    pub fn from_timeval((secs, micros): (u64, u32)) -> Duration {
        Duration::from_secs(secs) + Duration::from_micros(micros as u64)
    }
}

impl Default for TimeoutSpec {
    fn default() -> Self {
        Self::from_millis(DEFAULT_SEND_TIMEOUT_MS, DEFAULT_RECV_TIMEOUT_MS)
    }
}
