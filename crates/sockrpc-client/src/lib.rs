//! sockrpc Client
//!
//! Calls methods on remote service modules over framed socket connections.
//!
//! - [`RpcClient`] / [`FramedClient`]: one request frame out, one response
//!   frame back, over a lazily opened connection
//! - [`RetryingCallInvoker`]: encodes calls, decodes results, reconnects and
//!   retries on transport failures up to a bound
//! - [`ClientRegistry`]: one invoker per configured module key, built on
//!   first use and shared afterwards
//! - [`CallLogger`]: correlated records for every attempt outcome
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use sockrpc_client::ClientRegistry;
//! use sockrpc_common::config::FileConfig;
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = ClientRegistry::new(Arc::new(FileConfig::load("sockrpc.json")?));
//! let sum = registry.call("calc", "add", vec![json!(40), json!(2)])?;
//! assert_eq!(sum, json!(42));
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod invoker;
pub mod log;
pub mod registry;

pub use client::{FramedClient, RpcClient};
pub use invoker::{RetryConfig, RetryingCallInvoker, DEFAULT_MAX_RETRIES};
pub use log::{CallAttempt, CallLogger, CallOutcome, CallRecord, MemoryCallLogger, TracingCallLogger};
pub use registry::{ClientRegistry, SharedInvoker};
