use crate::protocol::{CallError, Request, Response, RpcResult};

/// Payload encoding used on top of the framed transport.
///
/// The transport layer never looks inside payloads; a codec turns a
/// [`Request`] into bytes and a response frame back into a result value.
pub trait Codec: Send + Sync {
    fn encode_request(&self, request: &Request) -> Result<Vec<u8>, CallError>;

    /// Decodes the response frame for the request with id `request_id`.
    ///
    /// A response without an id is accepted; one carrying a different id
    /// belongs to another request and is rejected.
    ///
    /// # Errors
    ///
    /// - `CallError::EmptyResponse` if `data` is empty
    /// - `CallError::Malformed` if `data` does not parse, answers another
    ///   request or carries no result
    /// - `CallError::Remote` if the peer reported an error
    fn decode_response(&self, request_id: &str, data: &[u8]) -> Result<RpcResult, CallError>;
}

/// JSON codec for encoding/decoding RPC messages
///
/// # Example
///
/// ```
/// use sockrpc_common::protocol::Request;
/// use sockrpc_common::transport::{Codec, JsonCodec};
/// use serde_json::json;
///
/// let codec = JsonCodec;
/// let request = Request::new("add", vec![json!(40), json!(2)]);
/// let bytes = codec.encode_request(&request).unwrap();
/// assert!(!bytes.is_empty());
///
/// let result = codec.decode_response(&request.id, br#"{"result": 42}"#).unwrap();
/// assert_eq!(result, json!(42));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    pub fn encode(request: &Request) -> Result<Vec<u8>, CallError> {
        serde_json::to_vec(request).map_err(|e| CallError::Encode(e.to_string()))
    }

    pub fn decode(data: &[u8]) -> Result<Response, CallError> {
        if data.iter().all(u8::is_ascii_whitespace) {
            return Err(CallError::EmptyResponse);
        }
        serde_json::from_slice(data).map_err(|e| CallError::Malformed(e.to_string()))
    }
}

impl Codec for JsonCodec {
    fn encode_request(&self, request: &Request) -> Result<Vec<u8>, CallError> {
        Self::encode(request)
    }

    fn decode_response(&self, request_id: &str, data: &[u8]) -> Result<RpcResult, CallError> {
        let response = Self::decode(data)?;

        if let Some(id) = response.id.as_deref() {
            if id != request_id {
                return Err(CallError::Malformed(format!(
                    "Response id {id} does not match request id {request_id}"
                )));
            }
        }

        if let Some(error) = response.error {
            return Err(CallError::Remote(error));
        }

        response
            .result
            .ok_or_else(|| CallError::Malformed("Missing result in response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_request_shape() {
        let request = Request::new("add", vec![json!(1), json!("two")]);
        let encoded = JsonCodec.encode_request(&request).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&encoded).unwrap();

        assert_eq!(value["method"], "add");
        assert_eq!(value["args"], json!([1, "two"]));
        assert_eq!(value["id"], json!(request.id));
    }

    #[test]
    fn test_decode_success() {
        let encoded = serde_json::to_vec(&Response::success("1", json!({"sum": 3}))).unwrap();
        assert_eq!(JsonCodec.decode_response("1", &encoded).unwrap(), json!({"sum": 3}));
    }

    #[test]
    fn test_decode_null_result_is_malformed() {
        // serde maps a JSON null onto a missing Option
        assert!(matches!(
            JsonCodec.decode_response("1", br#"{"result": null}"#),
            Err(CallError::Malformed(_))
        ));
    }

    #[test]
    fn test_decode_empty_payload() {
        assert!(matches!(
            JsonCodec.decode_response("1", b""),
            Err(CallError::EmptyResponse)
        ));
        assert!(matches!(
            JsonCodec.decode_response("1", b"  \n"),
            Err(CallError::EmptyResponse)
        ));
    }

    #[test]
    fn test_decode_garbage() {
        assert!(matches!(
            JsonCodec.decode_response("1", &[0xFF, 0x00, 0x12]),
            Err(CallError::Malformed(_))
        ));
    }

    #[test]
    fn test_decode_remote_error() {
        let err = JsonCodec
            .decode_response("1", br#"{"error": "unknown method: frobnicate"}"#)
            .unwrap_err();
        assert!(matches!(err, CallError::Remote(msg) if msg.contains("frobnicate")));
    }

    #[test]
    fn test_decode_missing_result() {
        assert!(matches!(
            JsonCodec.decode_response("abc", br#"{"id": "abc"}"#),
            Err(CallError::Malformed(_))
        ));
    }

    #[test]
    fn test_decode_without_id_is_accepted() {
        assert_eq!(JsonCodec.decode_response("abc", br#"{"result": 42}"#).unwrap(), json!(42));
    }

    #[test]
    fn test_decode_rejects_response_for_other_request() {
        let encoded = serde_json::to_vec(&Response::success("other", json!(100))).unwrap();
        let err = JsonCodec.decode_response("mine", &encoded).unwrap_err();
        assert!(matches!(err, CallError::Malformed(msg) if msg.contains("other")));
    }
}
