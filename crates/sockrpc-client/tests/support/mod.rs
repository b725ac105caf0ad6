//! Loopback service used by the client integration tests.
//!
//! Speaks the wire format directly with std sockets so the tests exercise the
//! client against an independent implementation of the framing.

use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde_json::{json, Value};
use sockrpc_common::protocol::{Request, Response};

/// Running test service; counts accepted connections.
pub struct TestService {
    pub port: u16,
    pub connections: Arc<AtomicUsize>,
}

impl TestService {
    /// Serves `add` and `echo`. The first `drop_first` connections are closed
    /// right after their request arrives, without a reply.
    pub fn spawn(drop_first: usize) -> Self {
        Self::start(move |index| {
            if index < drop_first {
                FirstReply::Drop
            } else {
                FirstReply::Normal
            }
        })
    }

    /// Serves like [`TestService::spawn`], but the first connection answers
    /// its first request only after `delay`.
    pub fn spawn_slow_first(delay: Duration) -> Self {
        Self::start(move |index| {
            if index == 0 {
                FirstReply::Delay(delay)
            } else {
                FirstReply::Normal
            }
        })
    }

    fn start<F>(behavior: F) -> Self
    where
        F: Fn(usize) -> FirstReply + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let connections = Arc::new(AtomicUsize::new(0));
        let counter = connections.clone();

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let index = counter.fetch_add(1, Ordering::SeqCst);
                let first = behavior(index);
                thread::spawn(move || serve(stream, first));
            }
        });

        Self { port, connections }
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

/// How a connection treats its first request.
#[derive(Clone, Copy)]
enum FirstReply {
    Normal,
    Drop,
    Delay(Duration),
}

fn serve(mut stream: TcpStream, mut first: FirstReply) {
    loop {
        let Ok(payload) = read_frame(&mut stream) else { return };
        match std::mem::replace(&mut first, FirstReply::Normal) {
            FirstReply::Drop => return,
            FirstReply::Delay(delay) => thread::sleep(delay),
            FirstReply::Normal => {}
        }

        let response = match serde_json::from_slice::<Request>(&payload) {
            Ok(request) => dispatch(&request),
            Err(e) => Response::error(String::new(), format!("bad request: {e}")),
        };
        let body = serde_json::to_vec(&response).unwrap();
        if write_frame(&mut stream, &body).is_err() {
            return;
        }
    }
}

fn dispatch(request: &Request) -> Response {
    match request.method.as_str() {
        "add" => {
            let sum: i64 = request.args.iter().filter_map(Value::as_i64).sum();
            Response::success(request.id.clone(), json!(sum))
        }
        "echo" => Response::success(request.id.clone(), Value::Array(request.args.clone())),
        other => Response::error(request.id.clone(), format!("no such method: {other}")),
    }
}

fn read_frame(stream: &mut TcpStream) -> io::Result<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf)?;
    let mut payload = vec![0u8; u32::from_be_bytes(len_buf) as usize];
    stream.read_exact(&mut payload)?;
    Ok(payload)
}

fn write_frame(stream: &mut TcpStream, payload: &[u8]) -> io::Result<()> {
    stream.write_all(&(payload.len() as u32).to_be_bytes())?;
    stream.write_all(payload)
}

/// A port with nothing listening on it.
pub fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}
