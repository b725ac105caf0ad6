//! Tests for the protocol module
//!
//! These tests verify request construction, id generation and the
//! wire shape of responses.

#[cfg(test)]
mod tests {
    use super::super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn test_request_creation() {
        let req = Request::new("add", vec![json!(1), json!(2)]);
        assert_eq!(req.method, "add");
        assert_eq!(req.args, vec![json!(1), json!(2)]);
        assert_eq!(req.id.len(), 16);
    }

    #[test]
    fn test_request_id_uniqueness() {
        let ids: HashSet<_> = (0..1000).map(|_| Request::new("test", vec![]).id).collect();
        assert_eq!(ids.len(), 1000, "All request IDs should be unique");
    }

    #[test]
    fn test_request_args_default_to_empty() {
        let req: Request = serde_json::from_str(r#"{"id":"1","method":"ping"}"#).unwrap();
        assert!(req.args.is_empty());
    }

    #[test]
    fn test_minimal_response_parses() {
        let resp: Response = serde_json::from_str(r#"{"result": 42}"#).unwrap();
        assert_eq!(resp.result, Some(json!(42)));
        assert!(resp.id.is_none());
        assert!(resp.error.is_none());
    }

    #[test]
    fn test_error_response_omits_result() {
        let resp = Response::error("7", "boom");
        let text = serde_json::to_string(&resp).unwrap();
        assert_eq!(text, r#"{"id":"7","error":"boom"}"#);
    }
}
