use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use sockrpc_common::config::ModuleConfig;
use sockrpc_common::protocol::{CallError, ConfigError, Request, Result, SockrpcError};
use sockrpc_common::transport::Codec;

use crate::client::{FramedClient, RpcClient};
use crate::log::{CallAttempt, CallLogger, CallOutcome, CallRecord, TracingCallLogger};

/// Retries after the initial attempt when the module config does not say.
pub const DEFAULT_MAX_RETRIES: usize = 2;

/// Retry bound for transport failures.
///
/// Total attempts = `max_retries + 1`. Retries are immediate: the reconnect
/// itself is the recovery step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_retries: usize,
}

impl RetryConfig {
    pub fn new(max_retries: usize) -> Self {
        Self { max_retries }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// Performs logical RPC calls and owns the retry/reconnect policy.
///
/// # Retry Logic
///
/// - Attempt 0: initial call over the (lazily opened) connection
/// - On a transport failure with retries left: reconnect, log a retry
///   record, try again
/// - On a transport failure with no retries left: close the connection, log
///   and return that error
/// - On a call failure (remote error, empty or malformed response): log and
///   return immediately, since reconnecting cannot fix it. Only a remote
///   error leaves the connection open; anything else may have left it out of
///   step with the peer, so it is closed and the next call reopens it.
///
/// A failed reconnect is logged and the next attempt proceeds anyway; that
/// attempt then fails with its own transport error. For `max_retries = k`
/// a call that never reaches the peer therefore makes exactly `k + 1`
/// attempts and `k` reconnects.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use sockrpc_client::RetryingCallInvoker;
/// use sockrpc_common::config::ModuleConfig;
/// use sockrpc_common::transport::JsonCodec;
/// use serde_json::json;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ModuleConfig::new("localhost", 9090, "Calc").with_max_retries(1);
/// let mut invoker = RetryingCallInvoker::from_config(&config, Arc::new(JsonCodec))?;
/// let sum = invoker.call("add", vec![json!(40), json!(2)])?;
/// # Ok(())
/// # }
/// ```
pub struct RetryingCallInvoker {
    client: Box<dyn RpcClient>,
    codec: Arc<dyn Codec>,
    logger: Arc<dyn CallLogger>,
    retry_config: RetryConfig,
    service_name: String,
    log_path: Option<String>,
}

impl std::fmt::Debug for RetryingCallInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryingCallInvoker")
            .field("retry_config", &self.retry_config)
            .field("service_name", &self.service_name)
            .field("log_path", &self.log_path)
            .finish_non_exhaustive()
    }
}

impl RetryingCallInvoker {
    pub fn new(client: Box<dyn RpcClient>, codec: Arc<dyn Codec>, retry_config: RetryConfig) -> Self {
        Self {
            client,
            codec,
            logger: Arc::new(TracingCallLogger),
            retry_config,
            service_name: String::new(),
            log_path: None,
        }
    }

    /// Builds an invoker bound to a framed client for `config`. No socket is
    /// opened until the first call.
    pub fn from_config(
        config: &ModuleConfig,
        codec: Arc<dyn Codec>,
    ) -> std::result::Result<Self, ConfigError> {
        let client = FramedClient::from_config(config, codec.clone())?;
        let retry_config = config
            .max_retries
            .map(RetryConfig::new)
            .unwrap_or_default();

        let mut invoker = Self::new(Box::new(client), codec, retry_config)
            .with_service_name(config.service_name.clone());
        invoker.log_path = config.log_path.clone();
        Ok(invoker)
    }

    pub fn with_logger(mut self, logger: Arc<dyn CallLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_service_name(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = service_name.into();
        self
    }

    pub fn with_log_path(mut self, log_path: impl Into<String>) -> Self {
        self.log_path = Some(log_path.into());
        self
    }

    pub fn retry_config(&self) -> RetryConfig {
        self.retry_config
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn endpoint(&self) -> String {
        self.client.endpoint()
    }

    /// Calls `method` with positional `args`, retrying transport failures.
    ///
    /// # Errors
    ///
    /// - `SockrpcError::Transport` - every attempt failed at the transport
    ///   level; the error is the one from the last attempt
    /// - `SockrpcError::Call` - the peer answered but the call failed
    pub fn call(&mut self, method: &str, args: Vec<Value>) -> Result<Value> {
        let request = Request::new(method, args);
        let started = Instant::now();
        let max_retries = self.retry_config.max_retries;

        let mut attempt = 0;
        loop {
            let outcome = self
                .client
                .invoke(&request)
                .and_then(|payload| Ok(self.codec.decode_response(&request.id, &payload)?));

            match outcome {
                Ok(value) => {
                    self.log(&request, attempt, started, CallOutcome::Success, None);
                    return Ok(value);
                }
                Err(e) if e.is_retryable() && attempt < max_retries => {
                    if let Err(reconnect_err) = self.client.reconnect() {
                        tracing::warn!(
                            request_id = %request.id,
                            attempt,
                            error = %reconnect_err,
                            "Reconnect failed, next attempt will reopen"
                        );
                    }
                    self.log(&request, attempt, started, CallOutcome::Retry, Some(&e));
                    attempt += 1;
                }
                Err(e) => {
                    if !matches!(e, SockrpcError::Call(CallError::Remote(_))) {
                        self.client.close();
                    }
                    self.log(&request, attempt, started, CallOutcome::Failure, Some(&e));
                    return Err(e);
                }
            }
        }
    }

    /// Closes the bound connection. The next call reopens it.
    pub fn close(&mut self) {
        self.client.close();
    }

    fn log(
        &self,
        request: &Request,
        attempt_index: usize,
        started: Instant,
        outcome: CallOutcome,
        error: Option<&SockrpcError>,
    ) {
        let record = CallRecord {
            component: self.service_name.clone(),
            log_path: self.log_path.clone(),
            outcome,
            attempt: CallAttempt {
                request_id: request.id.clone(),
                method: request.method.clone(),
                arguments: request.args.clone(),
                attempt_index,
                elapsed: started.elapsed(),
            },
            endpoint: self.client.endpoint(),
            error: error.map(|e| e.to_string()),
        };
        self.logger.record(&record);
    }
}
