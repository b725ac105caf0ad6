use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use sockrpc_common::config::ConfigSource;
use sockrpc_common::protocol::{ConfigError, Result};
use sockrpc_common::transport::{Codec, JsonCodec};

use crate::invoker::RetryingCallInvoker;
use crate::log::{CallLogger, TracingCallLogger};

/// Shared handle to a module's invoker. Calls through one handle are
/// serialized, since a connection carries one request/response at a time.
pub type SharedInvoker = Arc<Mutex<RetryingCallInvoker>>;

/// Process-wide cache of invokers, one per module key.
///
/// The first lookup of a key resolves its configuration and builds the
/// invoker; later lookups return the same handle. Construction happens under
/// the map lock so concurrent first lookups cannot build two invokers.
pub struct ClientRegistry {
    config: Arc<dyn ConfigSource>,
    codec: Arc<dyn Codec>,
    logger: Arc<dyn CallLogger>,
    entries: Mutex<HashMap<String, SharedInvoker>>,
}

impl ClientRegistry {
    pub fn new(config: Arc<dyn ConfigSource>) -> Self {
        Self {
            config,
            codec: Arc::new(JsonCodec),
            logger: Arc::new(TracingCallLogger),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn CallLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Returns the invoker for `module`, building it on first use.
    ///
    /// Building never connects; a missing or invalid module entry is
    /// reported here and nothing is cached for it.
    pub fn invoker(&self, module: &str) -> std::result::Result<SharedInvoker, ConfigError> {
        let mut entries = lock(&self.entries);
        if let Some(existing) = entries.get(module) {
            return Ok(existing.clone());
        }

        let config = self.config.resolve(module)?;
        let invoker = RetryingCallInvoker::from_config(&config, self.codec.clone())?
            .with_logger(self.logger.clone());
        let shared = Arc::new(Mutex::new(invoker));
        entries.insert(module.to_string(), shared.clone());

        tracing::debug!(module, endpoint = %config.endpoint(), "Registered client");
        Ok(shared)
    }

    /// Resolves `module` and calls `method` on it.
    pub fn call(&self, module: &str, method: &str, args: Vec<Value>) -> Result<Value> {
        let invoker = self.invoker(module)?;
        let mut invoker = lock(&invoker);
        invoker.call(method, args)
    }

    /// Keys of the modules built so far, sorted.
    pub fn modules(&self) -> Vec<String> {
        let mut keys: Vec<String> = lock(&self.entries).keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Closes every cached connection. Invokers stay registered and reopen
    /// on their next call.
    pub fn close_all(&self) {
        for invoker in lock(&self.entries).values() {
            lock(invoker).close();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
