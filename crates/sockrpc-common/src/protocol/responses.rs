//! sockrpc Response Types

use serde::{Deserialize, Serialize};
use super::RequestId;

/// RPC method result (JSON value)
pub type RpcResult = serde_json::Value;

/// A response frame as sent by the peer.
///
/// Every field is optional on the wire so that minimal peers can answer with
/// just `{"result": ...}` or `{"error": "..."}`.
///
/// # Example
///
/// ```
/// use sockrpc_common::protocol::responses::Response;
/// use serde_json::json;
///
/// let ok = Response::success("abc", json!(42));
/// assert_eq!(ok.result, Some(json!(42)));
///
/// let failed = Response::error("abc", "no such method: frobnicate");
/// assert!(failed.result.is_none());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Response {
    /// Request identifier this response corresponds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
    /// Result value (present on success)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<RpcResult>,
    /// Error message (present on failure)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn success(id: impl Into<RequestId>, result: RpcResult) -> Self {
        Response {
            id: Some(id.into()),
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: impl Into<RequestId>, error: impl Into<String>) -> Self {
        Response {
            id: Some(id.into()),
            result: None,
            error: Some(error.into()),
        }
    }
}
