//! sockrpc Common Types and Transport
//!
//! This crate provides the transport layer, payload codec, error taxonomy and
//! module configuration shared by the sockrpc client and CLI.
//!
//! # Overview
//!
//! - **Protocol Layer**: `Request`/`Response` types and the error taxonomy
//!   (`ConfigError`, `TransportError`, `CallError`)
//! - **Transport Layer**: blocking and event-loop socket backends behind one
//!   `Channel` trait, plus length-prefixed framing on top
//! - **Configuration**: module key → endpoint/timeouts/retry bound
//!
//! # Architecture
//!
//! - **Transport**: TCP or UNIX-domain stream socket, one connection per client
//! - **Serialization**: JSON
//! - **Message Format**: `[4-byte length prefix as u32 big-endian] + [payload]`
//! - **Max Frame Size**: 100 MB
//!
//! # Example
//!
//! ```no_run
//! use sockrpc_common::endpoint::{Endpoint, TimeoutSpec};
//! use sockrpc_common::protocol::Request;
//! use sockrpc_common::transport::{Channel, Codec, FramedTransport, JsonCodec, RawSocketTransport};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let socket = RawSocketTransport::new(Endpoint::inet("127.0.0.1", 9090), TimeoutSpec::default())?;
//! let mut framed = FramedTransport::new(socket);
//! framed.open()?;
//!
//! let request = Request::new("add", vec![json!(40), json!(2)]);
//! framed.write(&JsonCodec.encode_request(&request)?)?;
//! framed.flush()?;
//! let result = JsonCodec.decode_response(&request.id, &framed.read_frame()?)?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod endpoint;
pub mod protocol;
pub mod transport;

pub use config::{ConfigSource, FileConfig, ModuleConfig, StaticConfig};
pub use endpoint::{Endpoint, Family, TimeoutSpec};
pub use protocol::*;
