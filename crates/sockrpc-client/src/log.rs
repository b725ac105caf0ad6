//! Correlated call logging.
//!
//! Every terminal outcome of a call attempt (success, retry, final failure)
//! produces one [`CallRecord`]. Records are an observability side effect only:
//! a logger never fails and never influences control flow.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use serde_json::Value;

/// One attempt of a logical call, used only to correlate log output.
#[derive(Debug, Clone, PartialEq)]
pub struct CallAttempt {
    pub request_id: String,
    pub method: String,
    pub arguments: Vec<Value>,
    pub attempt_index: usize,
    /// Time since the logical call started.
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    Success,
    /// A transport failure that will be retried after reconnecting.
    Retry,
    Failure,
}

impl CallOutcome {
    pub fn is_error(self) -> bool {
        !matches!(self, CallOutcome::Success)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallRecord {
    /// Service name of the module the call went to.
    pub component: String,
    pub log_path: Option<String>,
    pub outcome: CallOutcome,
    pub attempt: CallAttempt,
    pub endpoint: String,
    pub error: Option<String>,
}

/// Sink for call records.
pub trait CallLogger: Send + Sync {
    fn record(&self, record: &CallRecord);
}

/// Emits call records as `tracing` events: `info` for successes, `error` for
/// retries and failures.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingCallLogger;

impl CallLogger for TracingCallLogger {
    fn record(&self, record: &CallRecord) {
        let args = serde_json::to_string(&record.attempt.arguments).unwrap_or_default();
        let log_path = record.log_path.as_deref().unwrap_or("");
        let error = record.error.as_deref().unwrap_or("");
        let elapsed_ms = record.attempt.elapsed.as_millis() as u64;

        if !record.outcome.is_error() {
            tracing::info!(
                component = %record.component,
                log_path,
                request_id = %record.attempt.request_id,
                method = %record.attempt.method,
                args = %args,
                endpoint = %record.endpoint,
                attempt = record.attempt.attempt_index,
                elapsed_ms,
                "RPC call succeeded"
            );
            return;
        }

        let message = match record.outcome {
            CallOutcome::Retry => "RPC call failed, reconnected for another attempt",
            _ => "RPC call failed",
        };
        tracing::error!(
            component = %record.component,
            log_path,
            request_id = %record.attempt.request_id,
            method = %record.attempt.method,
            args = %args,
            endpoint = %record.endpoint,
            attempt = record.attempt.attempt_index,
            elapsed_ms,
            error,
            "{}",
            message
        );
    }
}

/// Keeps records in memory, for inspection by embedding code and tests.
#[derive(Debug, Default)]
pub struct MemoryCallLogger {
    records: Mutex<Vec<CallRecord>>,
}

impl MemoryCallLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<CallRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn count(&self, outcome: CallOutcome) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| r.outcome == outcome)
            .count()
    }
}

impl CallLogger for MemoryCallLogger {
    fn record(&self, record: &CallRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
    }
}
