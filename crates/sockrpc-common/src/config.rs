//! Module configuration.
//!
//! A *module key* names one remote service. Resolving it yields the endpoint,
//! timeouts and retry bound used to build that service's invoker. Every check
//! happens here, before any socket exists.
//!
//! # File format
//!
//! ```json
//! {
//!   "modules": {
//!     "billing": {
//!       "host": "10.0.0.5",
//!       "port": 9090,
//!       "service_name": "BillingService",
//!       "log_path": "billing",
//!       "send_timeout_ms": 2000,
//!       "recv_timeout_ms": 5000,
//!       "max_retries": 1
//!     },
//!     "local": {
//!       "host": "/run/local.sock",
//!       "family": "unix",
//!       "service_name": "LocalService",
//!       "backend": "event_loop"
//!     }
//!   }
//! }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::endpoint::{
    Endpoint, Family, TimeoutSpec, DEFAULT_RECV_TIMEOUT_MS, DEFAULT_SEND_TIMEOUT_MS,
};
use crate::protocol::ConfigError;
use crate::transport::Backend;

/// Settings for one module key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub service_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send_timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recv_timeout_ms: Option<u64>,
    #[serde(default)]
    pub family: Family,
    #[serde(default)]
    pub backend: Backend,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<usize>,
}

impl ModuleConfig {
    pub fn new(host: impl Into<String>, port: u16, service_name: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            service_name: service_name.into(),
            log_path: None,
            send_timeout_ms: None,
            recv_timeout_ms: None,
            family: Family::Inet,
            backend: Backend::Blocking,
            max_retries: None,
        }
    }

    pub fn with_timeouts(mut self, send_ms: u64, recv_ms: u64) -> Self {
        self.send_timeout_ms = Some(send_ms);
        self.recv_timeout_ms = Some(recv_ms);
        self
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_log_path(mut self, log_path: impl Into<String>) -> Self {
        self.log_path = Some(log_path.into());
        self
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.host.clone(), self.port, self.family)
    }

    pub fn timeouts(&self) -> TimeoutSpec {
        TimeoutSpec::from_millis(
            self.send_timeout_ms.unwrap_or(DEFAULT_SEND_TIMEOUT_MS),
            self.recv_timeout_ms.unwrap_or(DEFAULT_RECV_TIMEOUT_MS),
        )
    }

    /// Checks required fields and the endpoint invariant for `module`.
    pub fn validate(&self, module: &str) -> Result<(), ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::MissingField {
                module: module.to_string(),
                field: "host",
            });
        }
        if self.family == Family::Inet && self.port == 0 {
            return Err(ConfigError::MissingField {
                module: module.to_string(),
                field: "port",
            });
        }
        if self.service_name.is_empty() {
            return Err(ConfigError::MissingField {
                module: module.to_string(),
                field: "service_name",
            });
        }
        self.endpoint().validate()
    }
}

/// Resolves module keys to their configuration.
pub trait ConfigSource: Send + Sync {
    /// Returns the validated configuration for `module`.
    fn resolve(&self, module: &str) -> Result<ModuleConfig, ConfigError>;

    /// All known module keys, sorted.
    fn modules(&self) -> Vec<String>;
}

/// In-memory configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticConfig {
    #[serde(default)]
    pub modules: HashMap<String, ModuleConfig>,
}

impl StaticConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_module(mut self, key: impl Into<String>, config: ModuleConfig) -> Self {
        self.modules.insert(key.into(), config);
        self
    }
}

impl ConfigSource for StaticConfig {
    fn resolve(&self, module: &str) -> Result<ModuleConfig, ConfigError> {
        let config = self
            .modules
            .get(module)
            .ok_or_else(|| ConfigError::MissingModule(module.to_string()))?;
        config.validate(module)?;
        Ok(config.clone())
    }

    fn modules(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.modules.keys().cloned().collect();
        keys.sort();
        keys
    }
}

/// Configuration loaded from a JSON file.
#[derive(Debug, Clone)]
pub struct FileConfig {
    path: PathBuf,
    inner: StaticConfig,
}

impl FileConfig {
    /// Reads and parses `path`. Individual modules are validated on `resolve`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let inner: StaticConfig =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?;

        tracing::debug!(path = %path.display(), modules = inner.modules.len(), "Loaded config");
        Ok(Self { path, inner })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigSource for FileConfig {
    fn resolve(&self, module: &str) -> Result<ModuleConfig, ConfigError> {
        self.inner.resolve(module)
    }

    fn modules(&self) -> Vec<String> {
        self.inner.modules()
    }
}
