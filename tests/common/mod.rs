//! Shared test helpers

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Once;
use std::time::Duration;

use crimson::Config;
use serde_json::{json, Map, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

static INIT: Once = Once::new();

pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Install a test subscriber once per binary
pub fn setup() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("debug")
            .with_test_writer()
            .try_init();
    });
}

/// Loopback listener on an ephemeral port, in-memory store, cheap hashing
pub fn test_config() -> Config {
    Config::from_yaml(
        r#"
id: 1
name: test
game:
  max_players: 2
  password_cost: 4
network:
  ip: 127.0.0.1
  port: 0
  traffic_check_interval_ms: 50
database:
  path: ":memory:"
"#,
    )
    .expect("test config is valid")
}

pub fn args(value: Value) -> Map<String, Value> {
    value.as_object().cloned().expect("args must be an object")
}

pub fn credentials(name: &str, password: &str) -> Map<String, Value> {
    args(json!({ "name": name, "password": password }))
}

/// Raw TCP client speaking the NUL-delimited protocol
pub struct TestClient {
    stream: TcpStream,
    buffer: Vec<u8>,
}

impl TestClient {
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connect");
        Self {
            stream,
            buffer: Vec::new(),
        }
    }

    pub async fn send_raw(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).await.expect("write");
    }

    pub async fn send(&mut self, packet: Value) {
        let mut bytes = serde_json::to_vec(&packet).expect("serialize");
        bytes.push(0);
        self.send_raw(&bytes).await;
    }

    pub async fn event(&mut self, cmd: &str, args: Value) {
        self.send(json!({ "type": "event", "body": { "cmd": cmd, "args": args } }))
            .await;
    }

    pub async fn request(&mut self, cmd: &str, args: Value) {
        self.send(json!({ "type": "request", "body": { "cmd": cmd, "args": args } }))
            .await;
    }

    /// Next packet, or `None` once the server closed the connection
    pub async fn recv(&mut self) -> Option<Value> {
        loop {
            if let Some(end) = self.buffer.iter().position(|b| *b == 0) {
                let frame: Vec<u8> = self.buffer.drain(..=end).collect();
                return Some(serde_json::from_slice(&frame[..end]).expect("server sent JSON"));
            }

            let mut chunk = [0u8; 1024];
            let read = tokio::time::timeout(TEST_TIMEOUT, self.stream.read(&mut chunk))
                .await
                .expect("timed out waiting for the server");
            match read {
                Ok(0) | Err(_) => return None,
                Ok(n) => self.buffer.extend_from_slice(&chunk[..n]),
            }
        }
    }
}
