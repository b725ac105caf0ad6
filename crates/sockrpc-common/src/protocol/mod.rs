pub mod error;
pub mod requests;
pub mod responses;

#[cfg(test)]
mod tests;

pub use error::{
    CallError, ConfigError, Result, SockrpcError, TransportError, TransportErrorKind,
};
pub use requests::{generate_request_id, MethodName, Request, RequestId, RpcArgs};
pub use responses::{Response, RpcResult};
