//! Test helpers for integration tests
//!
//! `MockGateway` accepts real WebSocket connections from the client under
//! test and lets each test play the server side by hand. `spawn_api` serves
//! an axum router on a random port and records what it was sent.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use axum::Router;
use cord_gateway::{BackoffConfig, GatewayConfig};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};

/// How long any single step may take before a test fails
pub const STEP_TIMEOUT: Duration = Duration::from_secs(5);

pub const TEST_TOKEN: &str = "test-token";

/// Gateway config pointed at a mock, with fast reconnects
pub fn test_config(url: &str) -> GatewayConfig {
    GatewayConfig::new(url)
        .with_backoff(BackoffConfig {
            initial: Duration::from_millis(10),
            max: Duration::from_millis(50),
            factor: 2.0,
            jitter: Duration::ZERO,
        })
        .with_connect_timeout(Duration::from_secs(2))
}

// ============================================================================
// Mock gateway
// ============================================================================

/// WebSocket server standing in for the platform gateway
pub struct MockGateway {
    listener: TcpListener,
    addr: SocketAddr,
}

impl MockGateway {
    pub async fn start() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        Ok(Self { listener, addr })
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Accept the next client connection
    pub async fn accept(&self) -> Result<MockConnection> {
        self.accept_within(STEP_TIMEOUT)
            .await?
            .ok_or_else(|| anyhow!("client did not connect within {STEP_TIMEOUT:?}"))
    }

    /// Accept a connection if one arrives in time
    pub async fn accept_within(&self, limit: Duration) -> Result<Option<MockConnection>> {
        let Ok(accepted) = tokio::time::timeout(limit, self.listener.accept()).await else {
            return Ok(None);
        };
        let (stream, _) = accepted?;
        let ws = accept_async(stream).await.context("WebSocket handshake failed")?;
        Ok(Some(MockConnection { ws }))
    }
}

/// Server side of one client connection
pub struct MockConnection {
    ws: WebSocketStream<TcpStream>,
}

impl MockConnection {
    pub async fn send(&mut self, frame: Value) -> Result<()> {
        self.send_text(&frame.to_string()).await
    }

    /// Send a text message as-is, valid frame or not
    pub async fn send_text(&mut self, text: &str) -> Result<()> {
        self.ws.send(Message::Text(text.to_string())).await?;
        Ok(())
    }

    pub async fn send_hello(&mut self, heartbeat_interval_ms: u64) -> Result<()> {
        self.send(json!({ "op": 10, "d": { "heartbeat_interval": heartbeat_interval_ms } }))
            .await
    }

    pub async fn send_dispatch(&mut self, seq: u64, event: &str, data: Value) -> Result<()> {
        self.send(json!({ "op": 0, "s": seq, "t": event, "d": data })).await
    }

    /// Send READY pointing resumes back at this mock
    pub async fn send_ready(&mut self, seq: u64, session_id: &str, resume_url: &str) -> Result<()> {
        self.send_dispatch(
            seq,
            "READY",
            json!({
                "v": 10,
                "user": { "id": "80351110224678912", "username": "cord", "discriminator": "0" },
                "guilds": [],
                "session_id": session_id,
                "resume_gateway_url": resume_url,
            }),
        )
        .await
    }

    pub async fn send_heartbeat_ack(&mut self) -> Result<()> {
        self.send(json!({ "op": 11 })).await
    }

    pub async fn close(&mut self, code: u16) -> Result<()> {
        self.ws
            .close(Some(CloseFrame {
                code: CloseCode::from(code),
                reason: "".into(),
            }))
            .await?;
        Ok(())
    }

    /// Next frame from the client
    pub async fn recv(&mut self) -> Result<Value> {
        loop {
            let message = tokio::time::timeout(STEP_TIMEOUT, self.ws.next())
                .await
                .map_err(|_| anyhow!("no frame within {STEP_TIMEOUT:?}"))?;
            match message {
                Some(Ok(Message::Text(text))) => return Ok(serde_json::from_str(&text)?),
                Some(Ok(Message::Close(frame))) => {
                    bail!("client closed with {:?}", frame.map(|f| u16::from(f.code)))
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => bail!("client went away"),
            }
        }
    }

    /// Next frame with the given op, answering heartbeats on the way
    pub async fn expect_op(&mut self, op: u64) -> Result<Value> {
        loop {
            let frame = self.recv().await?;
            let got = frame["op"].as_u64();
            if got == Some(op) {
                return Ok(frame);
            }
            if got == Some(1) {
                self.send_heartbeat_ack().await?;
                continue;
            }
            bail!("expected op {op}, got {frame}");
        }
    }

    /// Read until the client closes; returns its close code
    pub async fn wait_closed(&mut self) -> Result<Option<u16>> {
        loop {
            let message = tokio::time::timeout(STEP_TIMEOUT, self.ws.next())
                .await
                .map_err(|_| anyhow!("client did not close within {STEP_TIMEOUT:?}"))?;
            match message {
                Some(Ok(Message::Close(frame))) => return Ok(frame.map(|f| u16::from(f.code))),
                Some(Ok(_)) => {}
                Some(Err(_)) | None => return Ok(None),
            }
        }
    }

    /// HELLO, then expect IDENTIFY and answer with READY at `seq`
    pub async fn handshake(&mut self, seq: u64, session_id: &str, resume_url: &str) -> Result<Value> {
        self.send_hello(45_000).await?;
        let identify = self.expect_op(2).await?;
        self.send_ready(seq, session_id, resume_url).await?;
        Ok(identify)
    }
}

// ============================================================================
// Mock REST API
// ============================================================================

/// A request as the mock API saw it
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub authorization: Option<String>,
    pub body: Value,
}

/// Shared log of requests, handed to handlers as axum state
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl Recorder {
    pub fn record(&self, path: &str, authorization: Option<&str>, body: Value) {
        self.requests.lock().push(RecordedRequest {
            path: path.to_string(),
            authorization: authorization.map(str::to_string),
            body,
        });
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    pub fn last(&self) -> Option<RecordedRequest> {
        self.requests.lock().last().cloned()
    }
}

/// HTTP server running a router on a random port
pub struct MockApi {
    pub addr: SocketAddr,
    _handle: JoinHandle<()>,
}

impl MockApi {
    pub fn base_url(&self) -> String {
        format!("http://{}/api/v9", self.addr)
    }
}

/// Serve `router` (already given its state) on 127.0.0.1
pub async fn spawn_api(router: Router) -> Result<MockApi> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    Ok(MockApi {
        addr,
        _handle: handle,
    })
}
