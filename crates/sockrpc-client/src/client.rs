use std::sync::Arc;

use sockrpc_common::config::ModuleConfig;
use sockrpc_common::protocol::{ConfigError, Request, Result, TransportError};
use sockrpc_common::transport::{channel_for, Channel, Codec, FramedTransport};

/// Capability a service binding exposes to the invoker.
///
/// `invoke` performs one request/response exchange and returns the raw
/// response payload; decoding is left to the caller.
pub trait RpcClient: Send {
    fn invoke(&mut self, request: &Request) -> Result<Vec<u8>>;

    /// Replaces the connection, discarding any partially read or written frame.
    fn reconnect(&mut self) -> std::result::Result<(), TransportError>;

    fn close(&mut self);

    /// Endpoint domain, for log records.
    fn endpoint(&self) -> String;
}

/// RPC client speaking one framed request and one framed response per call.
///
/// The connection is opened lazily on the first call and reused afterwards.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use sockrpc_client::{FramedClient, RpcClient};
/// use sockrpc_common::config::ModuleConfig;
/// use sockrpc_common::protocol::Request;
/// use sockrpc_common::transport::JsonCodec;
/// use serde_json::json;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ModuleConfig::new("127.0.0.1", 9090, "Calc");
/// let mut client = FramedClient::from_config(&config, Arc::new(JsonCodec))?;
/// let payload = client.invoke(&Request::new("add", vec![json!(40), json!(2)]))?;
/// # Ok(())
/// # }
/// ```
pub struct FramedClient<C> {
    transport: FramedTransport<C>,
    codec: Arc<dyn Codec>,
}

impl<C: Channel + Send> FramedClient<C> {
    pub fn new(channel: C, codec: Arc<dyn Codec>) -> Self {
        Self {
            transport: FramedTransport::new(channel),
            codec,
        }
    }

    pub fn transport(&self) -> &FramedTransport<C> {
        &self.transport
    }

    /// One request frame out, then exactly one response frame in.
    fn exchange(&mut self, payload: &[u8]) -> std::result::Result<Vec<u8>, TransportError> {
        self.transport.open()?;
        self.transport.write(payload)?;
        self.transport.flush()?;
        self.transport.read_frame()
    }
}

impl FramedClient<Box<dyn Channel + Send>> {
    /// Builds an unopened client on the backend the module config selects.
    pub fn from_config(
        config: &ModuleConfig,
        codec: Arc<dyn Codec>,
    ) -> std::result::Result<Self, ConfigError> {
        let channel = channel_for(config.endpoint(), config.timeouts(), config.backend)?;
        Ok(Self::new(channel, codec))
    }
}

impl<C: Channel + Send> RpcClient for FramedClient<C> {
    fn invoke(&mut self, request: &Request) -> Result<Vec<u8>> {
        let payload = self.codec.encode_request(request)?;

        match self.exchange(&payload) {
            Ok(frame) => Ok(frame),
            Err(e) => {
                // A failed exchange may leave a late reply or half a frame in
                // the socket; the handle must not serve another request
                self.transport.close();
                Err(e.into())
            }
        }
    }

    fn reconnect(&mut self) -> std::result::Result<(), TransportError> {
        self.transport.reconnect()
    }

    fn close(&mut self) {
        self.transport.close();
    }

    fn endpoint(&self) -> String {
        self.transport.domain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sockrpc_common::protocol::SockrpcError;
    use sockrpc_common::transport::JsonCodec;
    use sockrpc_common::TransportErrorKind;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread;
    use std::time::Duration;

    fn read_request(peer: &mut TcpStream) -> Request {
        let mut len_buf = [0u8; 4];
        peer.read_exact(&mut len_buf).unwrap();
        let mut body = vec![0u8; u32::from_be_bytes(len_buf) as usize];
        peer.read_exact(&mut body).unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn write_reply(peer: &mut TcpStream, reply: &[u8]) {
        peer.write_all(&(reply.len() as u32).to_be_bytes()).unwrap();
        peer.write_all(reply).unwrap();
    }

    #[test]
    fn test_client_creation_does_not_connect() {
        let config = ModuleConfig::new("127.0.0.1", 9, "Nothing");
        let client = FramedClient::from_config(&config, Arc::new(JsonCodec)).unwrap();
        assert!(!client.transport().is_open());
        assert_eq!(client.endpoint(), "127.0.0.1:9");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ModuleConfig::new("", 9090, "Svc");
        assert!(FramedClient::from_config(&config, Arc::new(JsonCodec)).is_err());
    }

    #[test]
    fn test_invoke_sends_one_frame_and_reads_one_frame() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = thread::spawn(move || {
            let (mut peer, _) = listener.accept().unwrap();
            let request = read_request(&mut peer);
            assert_eq!(request.method, "echo");
            write_reply(&mut peer, br#"{"result": "pong"}"#);
        });

        let config = ModuleConfig::new("127.0.0.1", port, "Echo").with_timeouts(1_000, 1_000);
        let mut client = FramedClient::from_config(&config, Arc::new(JsonCodec)).unwrap();
        let payload = client.invoke(&Request::new("echo", vec![json!("ping")])).unwrap();
        assert_eq!(payload, br#"{"result": "pong"}"#);
        assert!(client.transport().is_open());
        server.join().unwrap();
    }

    #[test]
    fn test_invoke_against_closed_port_is_transport_error() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let config = ModuleConfig::new("127.0.0.1", port, "Gone").with_timeouts(500, 500);
        let mut client = FramedClient::from_config(&config, Arc::new(JsonCodec)).unwrap();

        let err = client.invoke(&Request::new("add", vec![])).unwrap_err();
        match err {
            SockrpcError::Transport(e) => assert_eq!(e.kind, TransportErrorKind::NotOpen),
            other => panic!("expected transport error, got {other}"),
        }
    }

    #[test]
    fn test_receive_timeout_drops_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = thread::spawn(move || {
            let (mut slow, _) = listener.accept().unwrap();
            let late = thread::spawn(move || {
                let request = read_request(&mut slow);
                thread::sleep(Duration::from_millis(300));
                // The client gave up on this connection before the reply
                let reply = format!(r#"{{"id": "{}", "result": 100}}"#, request.id);
                let _ = slow.write_all(&(reply.len() as u32).to_be_bytes());
                let _ = slow.write_all(reply.as_bytes());
            });

            let (mut fresh, _) = listener.accept().unwrap();
            let next = read_request(&mut fresh);
            assert_eq!(next.args, vec![json!(1), json!(1)]);
            write_reply(&mut fresh, br#"{"result": 2}"#);
            late.join().unwrap();
        });

        let config = ModuleConfig::new("127.0.0.1", port, "Slow").with_timeouts(1_000, 100);
        let mut client = FramedClient::from_config(&config, Arc::new(JsonCodec)).unwrap();

        let err = client.invoke(&Request::new("add", vec![json!(100)])).unwrap_err();
        assert!(err.is_retryable());
        assert!(!client.transport().is_open());

        let payload = client.invoke(&Request::new("add", vec![json!(1), json!(1)])).unwrap();
        assert_eq!(payload, br#"{"result": 2}"#);
        server.join().unwrap();
    }
}
